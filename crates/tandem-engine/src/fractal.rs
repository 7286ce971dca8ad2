//! Escape-time rendering of the Mandelbrot set.
//!
//! Each row is computed independently from the same parameters, so a
//! sequential render and a row-parallel render produce identical bytes.

use tandem_core::ProblemParams;
use tandem_core::params::BYTES_PER_PIXEL;

/// Region of the complex plane that is rendered.
const RE_MIN: f64 = -2.5;
const RE_MAX: f64 = 1.0;
const IM_MIN: f64 = -1.25;
const IM_MAX: f64 = 1.25;

/// Bytes in one output row.
pub fn row_len(params: &ProblemParams) -> usize {
    params.width as usize * BYTES_PER_PIXEL
}

/// Render row `y` into `row`, which must be exactly `row_len` bytes.
pub fn render_row(params: &ProblemParams, y: usize, row: &mut [u8]) {
    let width = params.width as f64;
    let height = params.height as f64;
    let im = IM_MIN + (y as f64 + 0.5) * (IM_MAX - IM_MIN) / height;

    for (x, pixel) in row.chunks_exact_mut(BYTES_PER_PIXEL).enumerate() {
        let re = RE_MIN + (x as f64 + 0.5) * (RE_MAX - RE_MIN) / width;
        let iterations = escape_time(re, im, params.max_iterations);
        pixel.copy_from_slice(&color(iterations, params.max_iterations));
    }
}

/// Render the whole image on the current thread.
pub fn render(params: &ProblemParams) -> Vec<u8> {
    let mut buf = vec![0u8; row_len(params) * params.height as usize];
    render_into(params, &mut buf);
    buf
}

/// Render into `buf`, which must hold exactly `height` rows.
pub fn render_into(params: &ProblemParams, buf: &mut [u8]) {
    for (y, row) in buf.chunks_exact_mut(row_len(params)).enumerate() {
        render_row(params, y, row);
    }
}

/// Iterations before `z = z^2 + c` leaves the radius-2 disc, or `max`.
fn escape_time(re: f64, im: f64, max: u32) -> u32 {
    let (mut zr, mut zi) = (0.0f64, 0.0f64);
    for i in 0..max {
        let (zr2, zi2) = (zr * zr, zi * zi);
        if zr2 + zi2 > 4.0 {
            return i;
        }
        zi = 2.0 * zr * zi + im;
        zr = zr2 - zi2 + re;
    }
    max
}

/// RGBA for an escape count. Points inside the set are opaque black.
fn color(iterations: u32, max: u32) -> [u8; 4] {
    if iterations >= max {
        return [0, 0, 0, 255];
    }
    let t = iterations as f64 / max as f64;
    let u = 1.0 - t;
    let r = 9.0 * u * t * t * t;
    let g = 15.0 * u * u * t * t;
    let b = 8.5 * u * u * u * t;
    [channel(r), channel(g), channel(b), 255]
}

fn channel(v: f64) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_size() {
        let params = ProblemParams::new(7, 5, 20);
        assert_eq!(render(&params).len(), 7 * 5 * 4);
    }

    #[test]
    fn test_origin_is_in_set() {
        assert_eq!(escape_time(0.0, 0.0, 100), 100);
        assert_eq!(color(100, 100), [0, 0, 0, 255]);
    }

    #[test]
    fn test_far_point_escapes_immediately() {
        assert_eq!(escape_time(2.0, 2.0, 100), 1);
    }

    #[test]
    fn test_rows_are_independent() {
        let params = ProblemParams::new(12, 9, 60);
        let full = render(&params);
        let len = row_len(&params);

        let mut row = vec![0u8; len];
        render_row(&params, 4, &mut row);
        assert_eq!(&full[4 * len..5 * len], row.as_slice());
    }

    #[test]
    fn test_every_pixel_opaque() {
        let params = ProblemParams::new(10, 10, 30);
        assert!(render(&params).chunks_exact(4).all(|p| p[3] == 255));
    }
}
