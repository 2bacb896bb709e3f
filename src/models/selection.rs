use camino::{Utf8Path, Utf8PathBuf};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Which of the two comparison targets a selection belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Left,
    Right,
}

impl Slot {
    /// Both slots, in the order the launcher asks for them
    pub const ALL: [Slot; 2] = [Slot::Left, Slot::Right];

    pub fn as_str(&self) -> &'static str {
        match self {
            Slot::Left => "left",
            Slot::Right => "right",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("Unknown slot '{0}' (expected 'left' or 'right')")]
pub struct UnknownSlot(pub String);

impl FromStr for Slot {
    type Err = UnknownSlot;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(Slot::Left),
            "right" => Ok(Slot::Right),
            _ => Err(UnknownSlot(s.to_string())),
        }
    }
}

/// Result of one "pick a file" request.
///
/// `path` is `None` when the user cancelled or the dialog failed; the two cases
/// are deliberately not distinguished. A chosen path is not checked for existence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionOutcome {
    pub slot: Slot,
    pub path: Option<Utf8PathBuf>,
}

impl SelectionOutcome {
    pub fn chosen(slot: Slot, path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            slot,
            path: Some(path.into()),
        }
    }

    pub fn empty(slot: Slot) -> Self {
        Self { slot, path: None }
    }

    pub fn is_empty(&self) -> bool {
        self.path.is_none()
    }
}

/// The two files the user has picked so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionPair {
    pub left: Option<Utf8PathBuf>,
    pub right: Option<Utf8PathBuf>,
}

impl SelectionPair {
    pub fn get(&self, slot: Slot) -> Option<&Utf8Path> {
        match slot {
            Slot::Left => self.left.as_deref(),
            Slot::Right => self.right.as_deref(),
        }
    }

    /// Record a selection outcome.
    ///
    /// An empty outcome keeps whatever was previously chosen for the slot, so a
    /// cancelled dialog never throws away an earlier pick. Returns true if the
    /// pair changed.
    pub fn apply(&mut self, outcome: SelectionOutcome) -> bool {
        let Some(path) = outcome.path else {
            return false;
        };

        let target = match outcome.slot {
            Slot::Left => &mut self.left,
            Slot::Right => &mut self.right,
        };

        if target.as_ref() == Some(&path) {
            return false;
        }

        *target = Some(path);
        true
    }

    /// Slots that still need a file
    pub fn missing(&self) -> Vec<Slot> {
        Slot::ALL
            .into_iter()
            .filter(|slot| self.get(*slot).is_none())
            .collect()
    }

    /// Both paths, if both have been chosen
    pub fn both(&self) -> Option<(Utf8PathBuf, Utf8PathBuf)> {
        match (&self.left, &self.right) {
            (Some(left), Some(right)) => Some((left.clone(), right.clone())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_round_trips_through_display() {
        for slot in Slot::ALL {
            assert_eq!(slot.to_string().parse::<Slot>().unwrap(), slot);
        }
        assert_eq!(" LEFT ".parse::<Slot>().unwrap(), Slot::Left);
    }

    #[test]
    fn test_unknown_slot_rejected() {
        let err = "middle".parse::<Slot>().unwrap_err();
        assert_eq!(err, UnknownSlot("middle".to_string()));
        assert!(err.to_string().contains("middle"));
    }

    #[test]
    fn test_empty_outcome_keeps_previous_choice() {
        let mut pair = SelectionPair::default();

        assert!(pair.apply(SelectionOutcome::chosen(Slot::Left, "/tmp/a.mp4")));
        assert!(!pair.apply(SelectionOutcome::empty(Slot::Left)));

        assert_eq!(pair.get(Slot::Left), Some(Utf8Path::new("/tmp/a.mp4")));
        assert_eq!(pair.missing(), vec![Slot::Right]);
        assert!(pair.both().is_none());
    }

    #[test]
    fn test_pair_complete_after_both_slots() {
        let mut pair = SelectionPair::default();
        pair.apply(SelectionOutcome::chosen(Slot::Left, "/tmp/a.mp4"));
        pair.apply(SelectionOutcome::chosen(Slot::Right, "/tmp/b.mp4"));

        assert!(pair.missing().is_empty());

        let (left, right) = pair.both().unwrap();
        assert_eq!(left, Utf8PathBuf::from("/tmp/a.mp4"));
        assert_eq!(right, Utf8PathBuf::from("/tmp/b.mp4"));
    }

    #[test]
    fn test_reapplying_same_path_is_not_a_change() {
        let mut pair = SelectionPair::default();
        assert!(pair.apply(SelectionOutcome::chosen(Slot::Right, "/tmp/b.mp4")));
        assert!(!pair.apply(SelectionOutcome::chosen(Slot::Right, "/tmp/b.mp4")));
        assert!(pair.apply(SelectionOutcome::chosen(Slot::Right, "/tmp/c.mp4")));
    }
}
