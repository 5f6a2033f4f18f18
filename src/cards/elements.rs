use crate::card::Card;
use crate::container::Entity;
use crate::error::Result;
use crate::format::FieldValue;
use crate::xref::Reference;

/// Material orientation of a shell element: an angle in degrees or the
/// identifier of a coordinate system.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Orientation {
    Theta(f64),
    Mcid(u32),
}

impl Default for Orientation {
    fn default() -> Self {
        Orientation::Theta(0.0)
    }
}

impl Orientation {
    fn read(card: &Card, i: usize) -> Result<Self> {
        match card.integer_or_double(i, "theta/mcid", FieldValue::Real(0.0))? {
            FieldValue::Int(_) => card.id_or_blank(i, "mcid", 0).map(Orientation::Mcid),
            FieldValue::Real(theta) => Ok(Orientation::Theta(theta)),
            _ => Ok(Orientation::default()),
        }
    }

    fn field(self) -> FieldValue {
        match self {
            Orientation::Theta(theta) => FieldValue::real_or_blank(theta, 0.0),
            Orientation::Mcid(mcid) => FieldValue::from(mcid),
        }
    }

    fn reference(self) -> Option<Reference> {
        match self {
            Orientation::Mcid(mcid) => Reference::optional("mcid", &["CORD2R"], mcid),
            Orientation::Theta(_) => None,
        }
    }
}

fn read_nodes<const N: usize>(card: &Card) -> Result<[u32; N]> {
    const NAMES: [&str; 4] = ["g1", "g2", "g3", "g4"];
    let mut nodes = [0; N];
    for (k, node) in nodes.iter_mut().enumerate() {
        *node = card.id(3 + k, NAMES[k])?;
    }
    Ok(nodes)
}

fn shell_fields(keyword: &str, eid: u32, pid: u32, nodes: &[u32], theta: Orientation, zoffs: Option<f64>) -> Vec<FieldValue> {
    let mut fields = vec![FieldValue::from(keyword), FieldValue::from(eid), FieldValue::from(pid)];
    fields.extend(nodes.iter().copied().map(FieldValue::from));
    fields.push(theta.field());
    fields.push(FieldValue::from(zoffs));
    fields
}

fn shell_references(pid: u32, nodes: &[u32], theta: Orientation) -> Vec<Reference> {
    const NAMES: [&str; 4] = ["g1", "g2", "g3", "g4"];
    let mut refs = vec![Reference::new("pid", &["PSHELL"], pid)];
    refs.extend(nodes.iter().zip(NAMES).map(|(&g, name)| Reference::new(name, &["GRID"], g)));
    refs.extend(theta.reference());
    refs
}

/// Four-noded shell element. A blank property id defaults to the element id.
#[derive(Debug, Clone, PartialEq)]
pub struct Cquad4 {
    pub eid: u32,
    pub pid: u32,
    pub nodes: [u32; 4],
    pub theta: Orientation,
    pub zoffs: Option<f64>,
}

impl Entity for Cquad4 {
    const KEYWORD: &'static str = "CQUAD4";
    const GROUP: &'static str = "ELEMENTS";

    fn from_card(card: &Card) -> Result<Self> {
        card.expect_max_fields(9)?;
        let eid = card.id(1, "eid")?;
        Ok(Self {
            eid,
            pid: card.optional_id(2, "pid")?.unwrap_or(eid),
            nodes: read_nodes(card)?,
            theta: Orientation::read(card, 7)?,
            zoffs: card.optional_double(8, "zoffs")?,
        })
    }

    fn id(&self) -> u32 {
        self.eid
    }

    fn raw_fields(&self) -> Vec<FieldValue> {
        shell_fields(Self::KEYWORD, self.eid, self.pid, &self.nodes, self.theta, self.zoffs)
    }

    fn references(&self) -> Vec<Reference> {
        shell_references(self.pid, &self.nodes, self.theta)
    }
}

/// Three-noded shell element.
#[derive(Debug, Clone, PartialEq)]
pub struct Ctria3 {
    pub eid: u32,
    pub pid: u32,
    pub nodes: [u32; 3],
    pub theta: Orientation,
    pub zoffs: Option<f64>,
}

impl Entity for Ctria3 {
    const KEYWORD: &'static str = "CTRIA3";
    const GROUP: &'static str = "ELEMENTS";

    fn from_card(card: &Card) -> Result<Self> {
        card.expect_max_fields(8)?;
        let eid = card.id(1, "eid")?;
        Ok(Self {
            eid,
            pid: card.optional_id(2, "pid")?.unwrap_or(eid),
            nodes: read_nodes(card)?,
            theta: Orientation::read(card, 6)?,
            zoffs: card.optional_double(7, "zoffs")?,
        })
    }

    fn id(&self) -> u32 {
        self.eid
    }

    fn raw_fields(&self) -> Vec<FieldValue> {
        shell_fields(Self::KEYWORD, self.eid, self.pid, &self.nodes, self.theta, self.zoffs)
    }

    fn references(&self) -> Vec<Reference> {
        shell_references(self.pid, &self.nodes, self.theta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn quad_reads_nodes_and_defaults_pid() {
        let quad = Cquad4::from_card(&Card::new("CQUAD4", &["10", "", "1", "2", "3", "4"])).unwrap();
        assert_eq!(quad.pid, 10);
        assert_eq!(quad.nodes, [1, 2, 3, 4]);
        assert_eq!(quad.theta, Orientation::Theta(0.0));
        let fields: Vec<&str> = quad.references().iter().map(|r| r.field).collect();
        assert_eq!(fields, vec!["pid", "g1", "g2", "g3", "g4"]);
    }

    #[test]
    fn integer_orientation_is_a_coordinate_system() {
        let tria = Ctria3::from_card(&Card::new("CTRIA3", &["5", "1", "1", "2", "3", "8", ".5"])).unwrap();
        assert_eq!(tria.theta, Orientation::Mcid(8));
        assert_eq!(tria.zoffs, Some(0.5));
        assert_eq!(tria.references().last().map(|r| (r.field, r.id)), Some(("mcid", 8)));

        let tria = Ctria3::from_card(&Card::new("CTRIA3", &["5", "1", "1", "2", "3", "45."])).unwrap();
        assert_eq!(tria.theta, Orientation::Theta(45.0));
        assert_eq!(tria.raw_fields()[6], FieldValue::Real(45.0));
    }

    #[test]
    fn missing_node_is_an_error() {
        assert!(Cquad4::from_card(&Card::new("CQUAD4", &["10", "1", "1", "2", "3"])).is_err());
    }
}
