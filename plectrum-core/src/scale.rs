//! Scale generation over the shared pitch-class table.
//!
//! A scale is built by walking a semitone interval pattern from a root pitch
//! class, wrapping modulo 12. Consumers use it to check whether a detected
//! note belongs to the scale being practiced.

use crate::note::{Note, NOTE_NAMES};

/// The supported scale families and their semitone interval patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleKind {
    Major,
    NaturalMinor,
    MajorPentatonic,
    MinorPentatonic,
}

impl ScaleKind {
    fn intervals(self) -> &'static [usize] {
        match self {
            ScaleKind::Major => &[2, 2, 1, 2, 2, 2, 1],
            ScaleKind::NaturalMinor => &[2, 1, 2, 2, 1, 2, 2],
            ScaleKind::MajorPentatonic => &[2, 2, 3, 2, 3],
            ScaleKind::MinorPentatonic => &[3, 2, 2, 3, 2],
        }
    }
}

/// An ordered run of pitch-class names from root back to root.
#[derive(Debug, Clone)]
pub struct Scale {
    names: Vec<&'static str>,
}

impl Scale {
    /// Builds the scale rooted at `root`.
    ///
    /// Returns `None` if `root` is not one of the twelve pitch-class names.
    pub fn new(root: &str, kind: ScaleKind) -> Option<Self> {
        let mut index = NOTE_NAMES.iter().position(|&name| name == root)?;
        let mut names = vec![NOTE_NAMES[index]];
        for &step in kind.intervals() {
            index = (index + step) % 12;
            names.push(NOTE_NAMES[index]);
        }
        Some(Self { names })
    }

    /// The scale degrees in order, starting and ending on the root.
    pub fn names(&self) -> &[&'static str] {
        &self.names
    }

    /// Whether the named pitch class belongs to this scale.
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|&n| n == name)
    }

    /// Whether the note's pitch class belongs to this scale. The octave is
    /// ignored.
    pub fn contains_note(&self, note: &Note) -> bool {
        self.contains(note.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::note::Note;

    #[test]
    fn c_major() {
        let scale = Scale::new("C", ScaleKind::Major).unwrap();
        assert_eq!(scale.names(), ["C", "D", "E", "F", "G", "A", "B", "C"]);
    }

    #[test]
    fn a_natural_minor() {
        let scale = Scale::new("A", ScaleKind::NaturalMinor).unwrap();
        assert_eq!(scale.names(), ["A", "B", "C", "D", "E", "F", "G", "A"]);
    }

    #[test]
    fn a_minor_pentatonic() {
        let scale = Scale::new("A", ScaleKind::MinorPentatonic).unwrap();
        assert_eq!(scale.names(), ["A", "C", "D", "E", "G", "A"]);
    }

    #[test]
    fn g_major_pentatonic_wraps_past_b() {
        let scale = Scale::new("G", ScaleKind::MajorPentatonic).unwrap();
        assert_eq!(scale.names(), ["G", "A", "B", "D", "E", "G"]);
    }

    #[test]
    fn membership_ignores_octave() {
        let scale = Scale::new("E", ScaleKind::MinorPentatonic).unwrap();
        assert!(scale.contains_note(&Note { name: "E", octave: 2 }));
        assert!(scale.contains_note(&Note { name: "E", octave: 4 }));
        assert!(!scale.contains_note(&Note { name: "C#", octave: 3 }));
    }

    #[test]
    fn unknown_root_is_rejected() {
        assert!(Scale::new("H", ScaleKind::Major).is_none());
        assert!(Scale::new("c", ScaleKind::Major).is_none());
    }
}
