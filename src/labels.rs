//! Class id to display name mapping and confirmation messages

use std::borrow::Cow;
use std::fmt;

/// Display names indexed by class id
///
/// Ids without a name are shown as the id itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GestureLabels {
    names: Vec<String>,
}

impl GestureLabels {
    pub fn new<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a comma-separated list such as `"none,swipe,tap"`
    #[must_use]
    pub fn from_csv(list: &str) -> Self {
        Self::new(list.split(',').map(str::trim).filter(|name| !name.is_empty()))
    }

    #[must_use]
    pub fn name(&self, id: usize) -> Cow<'_, str> {
        match self.names.get(id) {
            Some(name) => Cow::Borrowed(name.as_str()),
            None => Cow::Owned(id.to_string()),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Human-readable confirmation, e.g. `Gesture: swipe, Certainty: 93.5%`
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmationMessage<'a> {
    pub gesture: Cow<'a, str>,
    pub certainty: f64,
}

impl<'a> ConfirmationMessage<'a> {
    #[must_use]
    pub fn new(labels: &'a GestureLabels, label: usize, certainty: f64) -> Self {
        Self {
            gesture: labels.name(label),
            certainty,
        }
    }
}

impl fmt::Display for ConfirmationMessage<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Gesture: {}, Certainty: {:.1}%", self.gesture, self.certainty * 100.0)
    }
}
