//! The ordered set of modulation schemes a reader session probes.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tagwatch_hardware::{BaudRate, Modulation, ModulationType};

use crate::error::{ReaderError, Result};

/// Probe order used by [`ModulationCatalog::standard`].
const STANDARD_MODULATIONS: [Modulation; 6] = [
    Modulation::new(ModulationType::Iso14443a, BaudRate::Nbr106),
    Modulation::new(ModulationType::Iso14443b, BaudRate::Nbr106),
    Modulation::new(ModulationType::Felica, BaudRate::Nbr212),
    Modulation::new(ModulationType::Felica, BaudRate::Nbr424),
    Modulation::new(ModulationType::Jewel, BaudRate::Nbr106),
    Modulation::new(ModulationType::Iso14443biClass, BaudRate::Nbr106),
];

/// Ordered, duplicate-free list of modulations.
///
/// The order is the order in which readers probe the field. A catalog cannot
/// be changed once built.
///
/// # Examples
///
/// ```
/// use tagwatch_hardware::{BaudRate, Modulation, ModulationType};
/// use tagwatch_reader::ModulationCatalog;
///
/// let catalog = ModulationCatalog::standard();
/// assert_eq!(catalog.len(), 6);
/// assert!(catalog.contains(&Modulation::new(ModulationType::Felica, BaudRate::Nbr424)));
///
/// let type_a = Modulation::new(ModulationType::Iso14443a, BaudRate::Nbr106);
/// assert!(ModulationCatalog::new(vec![type_a, type_a]).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Modulation>", into = "Vec<Modulation>")]
pub struct ModulationCatalog {
    modulations: Vec<Modulation>,
}

impl ModulationCatalog {
    /// The six schemes probed by default, ISO14443A first and iClass last.
    pub fn standard() -> Self {
        Self {
            modulations: STANDARD_MODULATIONS.to_vec(),
        }
    }

    /// Build a catalog from a custom list.
    ///
    /// # Errors
    ///
    /// Returns [`ReaderError::InvalidConfig`] if the list is empty or names
    /// the same modulation twice.
    pub fn new(modulations: Vec<Modulation>) -> Result<Self> {
        if modulations.is_empty() {
            return Err(ReaderError::invalid_config(
                "modulation catalog must not be empty",
            ));
        }

        let mut seen = HashSet::with_capacity(modulations.len());
        if let Some(duplicate) = modulations.iter().find(|m| !seen.insert(**m)) {
            return Err(ReaderError::invalid_config(format!(
                "modulation {duplicate} listed more than once"
            )));
        }

        Ok(Self { modulations })
    }

    /// Modulations in probe order.
    pub fn as_slice(&self) -> &[Modulation] {
        &self.modulations
    }

    /// Iterate over the modulations in probe order.
    pub fn iter(&self) -> std::slice::Iter<'_, Modulation> {
        self.modulations.iter()
    }

    /// Whether `modulation` is probed by this catalog.
    pub fn contains(&self, modulation: &Modulation) -> bool {
        self.modulations.contains(modulation)
    }

    /// Number of modulations.
    pub fn len(&self) -> usize {
        self.modulations.len()
    }

    /// Always false for a constructed catalog.
    pub fn is_empty(&self) -> bool {
        self.modulations.is_empty()
    }
}

impl Default for ModulationCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl TryFrom<Vec<Modulation>> for ModulationCatalog {
    type Error = ReaderError;

    fn try_from(modulations: Vec<Modulation>) -> Result<Self> {
        Self::new(modulations)
    }
}

impl From<ModulationCatalog> for Vec<Modulation> {
    fn from(catalog: ModulationCatalog) -> Self {
        catalog.modulations
    }
}

impl<'a> IntoIterator for &'a ModulationCatalog {
    type Item = &'a Modulation;
    type IntoIter = std::slice::Iter<'a, Modulation>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
