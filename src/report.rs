use std::fmt::Display;
use std::io::{self, Write};

use chrono::{DateTime, Local, TimeZone, Utc};

use crate::predict::Window;
use crate::scheduler::Chunk;

const TIME_FORMAT: &str = "%m-%d %H:%M:%S";

/// `MM-DD HH:MM:SS -- MM-DD HH:MM:SS (max el. EE.EE): NAME` in the given zone.
pub fn format_window<Tz>(window: &Window, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    format!(
        "{} -- {} (max el. {:5.2}): {}",
        format_time(window.aos, tz),
        format_time(window.los, tz),
        window.max_elevation_deg,
        window.satellite
    )
}

fn format_time<Tz>(time: DateTime<Utc>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    time.with_timezone(tz).format(TIME_FORMAT).to_string()
}

pub fn display<W: Write>(out: &mut W, windows: &[Window]) -> io::Result<()> {
    display_in(out, windows, &Local)
}

pub fn display_in<W, Tz>(out: &mut W, windows: &[Window], tz: &Tz) -> io::Result<()>
where
    W: Write,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    for window in windows {
        writeln!(out, "{}", format_window(window, tz))?;
    }
    Ok(())
}

pub fn display_chunks<W: Write>(out: &mut W, chunks: &[Chunk]) -> io::Result<()> {
    display_chunks_in(out, chunks, &Local)
}

pub fn display_chunks_in<W, Tz>(out: &mut W, chunks: &[Chunk], tz: &Tz) -> io::Result<()>
where
    W: Write,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    for (i, chunk) in chunks.iter().enumerate() {
        if i > 0 {
            writeln!(out)?;
        }
        writeln!(
            out,
            "chunk {}: {} -- {}",
            i + 1,
            format_time(chunk.start(), tz),
            format_time(chunk.end(), tz)
        )?;
        for window in chunk.windows() {
            writeln!(out, "  {}", format_window(window, tz))?;
        }
    }
    Ok(())
}

pub fn write_json<W: Write>(out: &mut W, windows: &[Window]) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, windows)?;
    writeln!(out)
}
