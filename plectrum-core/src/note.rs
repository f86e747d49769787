//! # Note Conversion Module
//!
//! Conversions between frequencies and musical notes in twelve-tone equal
//! temperament, referenced to A4 = 440 Hz. This module owns the single
//! pitch-class name table; every other component refers to it here.

use once_cell::sync::Lazy;
use std::collections::BTreeMap;
use std::fmt;

/// The twelve pitch-class names, starting at C.
///
/// MIDI-style indexing: `NOTE_NAMES[midi % 12]` names the pitch class of a
/// MIDI note number, with 69 = A4.
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Static map for quick note name to pitch-class lookups.
static NAME_TO_PITCH_CLASS: Lazy<BTreeMap<&'static str, i32>> = Lazy::new(|| {
    NOTE_NAMES
        .iter()
        .enumerate()
        .map(|(i, &name)| (name, i as i32))
        .collect()
});

/// A musical note: a pitch-class name plus an octave.
///
/// Two notes are equal iff both the name and the octave match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    /// Pitch-class name, always one of [`NOTE_NAMES`].
    pub name: &'static str,
    /// Octave in scientific pitch notation (A4 is octave 4).
    pub octave: i32,
}

impl Note {
    /// The ideal equal-tempered frequency of this note in Hz.
    pub fn frequency(&self) -> f32 {
        // Safe: `name` always comes from NOTE_NAMES.
        note_to_frequency(self.name, self.octave).unwrap()
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.octave)
    }
}

/// Maps a frequency in Hz to the nearest equal-tempered note.
///
/// Computes the MIDI-style index `round(69 + 12·log2(f / 440))` and splits it
/// into pitch class and octave. Rounding is half-away-from-zero (`f32::round`),
/// so a frequency exactly a quarter-tone above a note resolves to the note
/// above it. The mapping is lossy: the result can be up to 50 cents away
/// from the input.
///
/// # Returns
/// * `Some(note)` - The nearest note
/// * `None` - The frequency is zero or negative (no defined pitch)
pub fn frequency_to_note(frequency: f32) -> Option<Note> {
    if frequency <= 0.0 {
        return None;
    }
    let midi = (69.0 + 12.0 * (frequency / 440.0).log2()).round() as i32;
    let pitch_class = midi.rem_euclid(12) as usize;
    let octave = midi.div_euclid(12) - 1;
    Some(Note {
        name: NOTE_NAMES[pitch_class],
        octave,
    })
}

/// Maps a note name and octave to its equal-tempered frequency in Hz.
///
/// # Returns
/// * `Some(frequency)` - The ideal frequency
/// * `None` - The name is not one of the twelve recognized pitch classes
pub fn note_to_frequency(name: &str, octave: i32) -> Option<f32> {
    let pitch_class = NAME_TO_PITCH_CLASS.get(name)?;
    let midi = pitch_class + (octave + 1) * 12;
    Some(440.0 * 2.0_f32.powf((midi - 69) as f32 / 12.0))
}

/// Deviation of `frequency` from `target_frequency` in cents
/// (100 cents = one semitone, positive = sharp).
pub fn cents_deviation(frequency: f32, target_frequency: f32) -> f32 {
    1200.0 * (frequency / target_frequency).log2()
}
