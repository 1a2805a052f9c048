//! Export curvature-comb geometry to CSV.
//!
//! One row per tooth, for plotting in spreadsheets or downstream scripts.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::domain::Surface;
use crate::error::AppError;
use crate::plot::CombTooth;

/// Write comb teeth of both surfaces to a CSV file.
pub fn write_comb_csv(path: &Path, upper: &[CombTooth], lower: &[CombTooth]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create comb CSV '{}': {e}", path.display())))?;
    let mut out = BufWriter::new(file);
    write_comb_rows(&mut out, upper, lower)
        .and_then(|_| out.flush())
        .map_err(|e| AppError::new(2, format!("Failed to write comb CSV '{}': {e}", path.display())))
}

fn write_comb_rows<W: Write>(out: &mut W, upper: &[CombTooth], lower: &[CombTooth]) -> std::io::Result<()> {
    writeln!(out, "surface,u,x,y,tip_x,tip_y,curvature")?;
    for (surface, teeth) in [(Surface::Upper, upper), (Surface::Lower, lower)] {
        for t in teeth {
            writeln!(
                out,
                "{},{:.10},{:.10},{:.10},{:.10},{:.10},{:.10}",
                surface.label(),
                t.u,
                t.base.x,
                t.base.y,
                t.tip.x,
                t.tip.y,
                t.curvature
            )?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point2;

    #[test]
    fn rows_are_labelled_by_surface() {
        let tooth = CombTooth {
            u: 0.5,
            base: Point2::new(0.5, 0.1),
            tip: Point2::new(0.5, 0.2),
            curvature: -2.0,
        };
        let mut buf = Vec::new();
        write_comb_rows(&mut buf, &[tooth], &[tooth, tooth]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "surface,u,x,y,tip_x,tip_y,curvature");
        assert!(lines[1].starts_with("upper,0.5000000000,"));
        assert!(lines[3].starts_with("lower,"));
        assert!(lines[3].ends_with(",-2.0000000000"));
    }

    #[test]
    fn unwritable_path_is_exit_code_2() {
        let err = write_comb_csv(Path::new("/nonexistent/dir/comb.csv"), &[], &[]).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
