use super::geometry::Geometry;
use super::ids::ConformerId;
use super::results::ConformerResults;

/// One 3-D geometry candidate of the ensemble's molecule.
///
/// Charge and unpaired-electron count describe the molecule, not the geometry:
/// they are fixed at creation and there is no way to change them afterwards.
/// Conformers are only created through an [`Ensemble`](super::ensemble::Ensemble),
/// which guarantees the values are identical for all of its members.
#[derive(Debug, Clone, PartialEq)]
pub struct Conformer {
    id: ConformerId,
    charge: i32,
    unpaired: u32,
    geometry: Geometry,
    results: ConformerResults,
}

impl Conformer {
    pub(crate) fn new(id: ConformerId, charge: i32, unpaired: u32, geometry: Geometry) -> Self {
        Self {
            id,
            charge,
            unpaired,
            geometry,
            results: ConformerResults::new(),
        }
    }

    pub fn id(&self) -> &ConformerId {
        &self.id
    }

    pub fn charge(&self) -> i32 {
        self.charge
    }

    pub fn unpaired(&self) -> u32 {
        self.unpaired
    }

    /// Spin multiplicity, `2S + 1`.
    pub fn multiplicity(&self) -> u32 {
        self.unpaired + 1
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn results(&self) -> &ConformerResults {
        &self.results
    }

    pub(crate) fn results_mut(&mut self) -> &mut ConformerResults {
        &mut self.results
    }

    pub(crate) fn replace_geometry(&mut self, geometry: Geometry) -> Geometry {
        std::mem::replace(&mut self.geometry, geometry)
    }
}
