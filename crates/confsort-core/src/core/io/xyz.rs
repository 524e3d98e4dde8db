use crate::core::io::traits::EnsembleFile;
use crate::core::models::geometry::{Geometry, GeometryAtom};
use nalgebra::Point3;
use std::io::{self, BufRead, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum XyzError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse { line: usize, kind: XyzParseErrorKind },
    #[error("Frame {frame} ends after {found} of {expected} atoms")]
    TruncatedFrame {
        frame: usize,
        expected: usize,
        found: usize,
    },
    #[error("File contains no frames")]
    Empty,
}

#[derive(Debug, Error)]
pub enum XyzParseErrorKind {
    #[error("Invalid atom count '{0}'")]
    InvalidAtomCount(String),
    #[error("Atom record needs an element and three coordinates")]
    ShortAtomRecord,
    #[error("Invalid coordinate '{0}'")]
    InvalidCoordinate(String),
    #[error("Invalid element symbol '{0}'")]
    InvalidElement(String),
}

/// Multi-frame XYZ coordinate files, one frame per conformer.
pub struct XyzFile;

/// Normalizes an element symbol to its conventional capitalization (`cl` → `Cl`).
fn normalize_element(symbol: &str) -> Option<String> {
    let mut chars = symbol.chars();
    let first = chars.next()?;
    if !first.is_ascii_alphabetic() || !chars.clone().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let mut normalized = first.to_ascii_uppercase().to_string();
    normalized.extend(chars.map(|c| c.to_ascii_lowercase()));
    Some(normalized)
}

fn parse_atom(line: &str, line_num: usize) -> Result<GeometryAtom, XyzError> {
    let parse_err = |kind| XyzError::Parse {
        line: line_num,
        kind,
    };
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 4 {
        return Err(parse_err(XyzParseErrorKind::ShortAtomRecord));
    }
    let element = normalize_element(fields[0])
        .ok_or_else(|| parse_err(XyzParseErrorKind::InvalidElement(fields[0].to_string())))?;
    let mut coords = [0.0; 3];
    for (slot, raw) in coords.iter_mut().zip(&fields[1..4]) {
        *slot = raw
            .parse::<f64>()
            .map_err(|_| parse_err(XyzParseErrorKind::InvalidCoordinate(raw.to_string())))?;
    }
    Ok(GeometryAtom::new(
        element,
        Point3::new(coords[0], coords[1], coords[2]),
    ))
}

/// Upper bound on the atoms reserved up front from an unverified header.
const PREALLOCATED_ATOMS: usize = 1024;

impl EnsembleFile for XyzFile {
    type Content = Vec<Geometry>;
    type Error = XyzError;

    fn read_from(reader: &mut impl BufRead) -> Result<Self::Content, Self::Error> {
        let mut frames = Vec::new();
        let mut lines = reader.lines().enumerate();

        while let Some((line_num, line_res)) = lines.next() {
            let line = line_res?;
            let header = line.trim();
            if header.is_empty() {
                continue;
            }
            let expected: usize = header.parse().map_err(|_| XyzError::Parse {
                line: line_num + 1,
                kind: XyzParseErrorKind::InvalidAtomCount(header.to_string()),
            })?;

            let comment = match lines.next() {
                Some((_, comment)) => comment?.trim().to_string(),
                None => String::new(),
            };

            let capacity = expected.min(PREALLOCATED_ATOMS);
            let mut geometry = Geometry::from_atoms(Vec::with_capacity(capacity), comment);
            while geometry.len() < expected {
                let Some((atom_line_num, atom_line)) = lines.next() else {
                    return Err(XyzError::TruncatedFrame {
                        frame: frames.len() + 1,
                        expected,
                        found: geometry.len(),
                    });
                };
                geometry.push(parse_atom(&atom_line?, atom_line_num + 1)?);
            }
            frames.push(geometry);
        }

        if frames.is_empty() {
            return Err(XyzError::Empty);
        }
        Ok(frames)
    }

    fn write_to(content: &Self::Content, writer: &mut impl Write) -> Result<(), Self::Error> {
        for geometry in content {
            writeln!(writer, "{}", geometry.len())?;
            writeln!(writer, "{}", geometry.comment)?;
            for atom in geometry.atoms() {
                writeln!(
                    writer,
                    "{:<3}{:>16.10}{:>16.10}{:>16.10}",
                    atom.element, atom.position.x, atom.position.y, atom.position.z
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const TWO_FRAMES: &str = "\
3
conformer one
O   0.000000   0.000000   0.000000
h   0.960000   0.000000   0.000000
H  -0.240000   0.930000   0.000000

3
conformer two
O   0.100000   0.000000   0.000000
H   1.060000   0.000000   0.000000
H  -0.140000   0.930000   0.000000
";

    #[test]
    fn reads_every_frame_with_comments() {
        let frames = XyzFile::read_from(&mut Cursor::new(TWO_FRAMES)).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].comment, "conformer one");
        assert_eq!(frames[1].atoms()[0].position, Point3::new(0.1, 0.0, 0.0));
    }

    #[test]
    fn normalizes_element_capitalization() {
        let frames = XyzFile::read_from(&mut Cursor::new(TWO_FRAMES)).unwrap();
        assert!(frames[0].same_topology(&frames[1]));
        assert_eq!(normalize_element("cL").as_deref(), Some("Cl"));
        assert_eq!(normalize_element("6"), None);
    }

    #[test]
    fn truncated_frame_is_reported() {
        let input = "3\nshort\nO 0 0 0\nH 1 0 0\n";
        let err = XyzFile::read_from(&mut Cursor::new(input)).unwrap_err();
        assert!(matches!(
            err,
            XyzError::TruncatedFrame {
                frame: 1,
                expected: 3,
                found: 2
            }
        ));
    }

    #[test]
    fn oversized_atom_count_is_a_truncated_frame() {
        let input = format!("{}\ncomment\nH 0 0 0\n", usize::MAX);
        let err = XyzFile::read_from(&mut Cursor::new(input)).unwrap_err();
        assert!(matches!(
            err,
            XyzError::TruncatedFrame {
                frame: 1,
                expected: usize::MAX,
                found: 1
            }
        ));
    }

    #[test]
    fn bad_coordinate_reports_line_number() {
        let input = "1\n\nC 0.0 zero 0.0\n";
        let err = XyzFile::read_from(&mut Cursor::new(input)).unwrap_err();
        assert!(matches!(err, XyzError::Parse { line: 3, .. }));
    }

    #[test]
    fn empty_input_is_an_error() {
        let err = XyzFile::read_from(&mut Cursor::new("\n\n")).unwrap_err();
        assert!(matches!(err, XyzError::Empty));
    }

    #[test]
    fn written_file_reads_back_identically() {
        let frames = XyzFile::read_from(&mut Cursor::new(TWO_FRAMES)).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.xyz");
        XyzFile::write_to_path(&frames, &path).unwrap();
        let reread = XyzFile::read_from_path(&path).unwrap();
        assert_eq!(reread, frames);
    }
}
