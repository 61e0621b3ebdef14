//! Static spectrum charts: a PNG line plot of magnitude against RPM, and a JSON dump
//! of the same points.

use image::{Rgb, RgbImage};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use crate::audio::spectrum::SpectrumPoint;
use crate::error::{Error, Result};
use crate::Rpm;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const AXIS: Rgb<u8> = Rgb([40, 40, 40]);
const LINE: Rgb<u8> = Rgb([200, 30, 30]);
const PEAK: Rgb<u8> = Rgb([30, 90, 200]);
const MARGIN: u32 = 40;

#[derive(Serialize)]
struct ChartData<'a> {
    peak_rpm: Rpm,
    points: &'a [SpectrumPoint],
}

pub fn write_json(points: &[SpectrumPoint], peak_rpm: Rpm, path: &Path) -> Result<()> {
    let file = File::create(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::to_writer_pretty(BufWriter::new(file), &ChartData { peak_rpm, points })
        .map_err(|e| Error::Chart(e.to_string()))
}

/// Plots magnitude (y) against RPM (x), with a vertical marker at the peak.
pub fn plot(points: &[SpectrumPoint], peak_rpm: Rpm, width: u32, height: u32) -> RgbImage {
    let mut img = RgbImage::from_pixel(width, height, BACKGROUND);
    if width <= 2 * MARGIN || height <= 2 * MARGIN {
        return img;
    }

    let left = MARGIN;
    let right = width - MARGIN;
    let top = MARGIN;
    let bottom = height - MARGIN;

    draw_line(&mut img, (left, bottom), (right, bottom), AXIS);
    draw_line(&mut img, (left, top), (left, bottom), AXIS);

    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return img;
    };
    let min_rpm = first.rpm;
    let span = (last.rpm - min_rpm).max(f64::EPSILON);
    let max_mag = points
        .iter()
        .map(|p| p.magnitude)
        .fold(0.0f64, f64::max)
        .max(f64::EPSILON);

    let to_px = |rpm: f64, magnitude: f64| -> (u32, u32) {
        let x = left as f64 + (rpm - min_rpm) / span * (right - left) as f64;
        let y = bottom as f64 - magnitude / max_mag * (bottom - top) as f64;
        (x.round() as u32, y.round() as u32)
    };

    if peak_rpm > 0 {
        let (x, _) = to_px(peak_rpm as f64, 0.0);
        if (left..=right).contains(&x) {
            draw_line(&mut img, (x, top), (x, bottom), PEAK);
        }
    }

    let mut prev = None;
    for p in points {
        let px = to_px(p.rpm, p.magnitude);
        if let Some(from) = prev {
            draw_line(&mut img, from, px, LINE);
        }
        prev = Some(px);
    }

    img
}

pub fn render_png(
    points: &[SpectrumPoint],
    peak_rpm: Rpm,
    path: &Path,
    width: u32,
    height: u32,
) -> Result<()> {
    plot(points, peak_rpm, width, height)
        .save(path)
        .map_err(|e| Error::Chart(format!("{}: {}", path.display(), e)))?;
    log::info!("Wrote spectrum chart to {}", path.display());
    Ok(())
}

// Bresenham, clipped to the image bounds.
fn draw_line(img: &mut RgbImage, from: (u32, u32), to: (u32, u32), color: Rgb<u8>) {
    let (mut x0, mut y0) = (from.0 as i64, from.1 as i64);
    let (x1, y1) = (to.0 as i64, to.1 as i64);
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if x0 >= 0 && y0 >= 0 && (x0 as u32) < img.width() && (y0 as u32) < img.height() {
            img.put_pixel(x0 as u32, y0 as u32, color);
        }
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
