//! Initial-data state of a resolved fetch configuration.
//!
//! A fetch definition either carries initial data or it doesn't. That single
//! fact decides which of the two output shapes the factory produces:
//!
//! | State | Initial data | Loading state before first fetch |
//! |-------|--------------|----------------------------------|
//! | **Seeded** | always available | none |
//! | **Cold** | absent | loading until the first fetch resolves |
//!
//! Both shapes share the same runtime contract (same key, same bound fetch
//! function). Only the availability guarantee differs.

/// Whether a fetch configuration starts with data.
///
/// # Examples
///
/// ```
/// use query_kit::DataState;
///
/// assert_eq!(DataState::default(), DataState::Cold);
/// assert!(DataState::Seeded.has_initial_data());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DataState {
    /// Initial data (or a thunk producing it) was supplied.
    Seeded,

    /// No initial data; consumers see a loading state until the first fetch.
    #[default]
    Cold,
}

impl DataState {
    pub fn has_initial_data(self) -> bool {
        matches!(self, DataState::Seeded)
    }
}

impl std::fmt::Display for DataState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataState::Seeded => write!(f, "Seeded"),
            DataState::Cold => write!(f, "Cold"),
        }
    }
}
