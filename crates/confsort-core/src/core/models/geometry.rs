use nalgebra::Point3;

/// One atom of a conformer geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryAtom {
    /// The element symbol (e.g., "C", "H", "Cl").
    pub element: String,
    /// The Cartesian position in Angstroms.
    pub position: Point3<f64>,
}

impl GeometryAtom {
    pub fn new(element: impl Into<String>, position: Point3<f64>) -> Self {
        Self {
            element: element.into(),
            position,
        }
    }
}

/// The 3-D arrangement of a conformer.
///
/// All conformers of one ensemble share the same element sequence; only the
/// positions differ.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Geometry {
    /// Free-form comment line carried through from the input file.
    pub comment: String,
    atoms: Vec<GeometryAtom>,
}

impl Geometry {
    /// Creates an empty geometry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a geometry from a list of atoms and a comment line.
    ///
    /// # Arguments
    ///
    /// * `atoms` - The atoms in file order.
    /// * `comment` - The comment line (may be empty).
    pub fn from_atoms(atoms: Vec<GeometryAtom>, comment: impl Into<String>) -> Self {
        Self {
            comment: comment.into(),
            atoms,
        }
    }

    pub fn push(&mut self, atom: GeometryAtom) {
        self.atoms.push(atom);
    }

    pub fn atoms(&self) -> &[GeometryAtom] {
        &self.atoms
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// Returns the element symbols in atom order.
    pub fn elements(&self) -> impl Iterator<Item = &str> {
        self.atoms.iter().map(|atom| atom.element.as_str())
    }

    /// Whether `other` describes the same molecular topology (same elements in the same order).
    pub fn same_topology(&self, other: &Geometry) -> bool {
        self.len() == other.len() && self.elements().eq(other.elements())
    }
}
