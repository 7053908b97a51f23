//! Equivalence-class and mapping records
//!
//! A compact binary sidecar format carrying results that outlive a graph:
//! candidate-equivalence classes with their proof status, and the mapping of
//! nodes onto multi-input cells. Streams are sequences of records, each a
//! one-byte tag, a varint payload length and the payload. All integers are
//! 7-bit-per-byte varints and all ids are delta-encoded, so payloads stay
//! small on the dense, sorted ids the sweep produces.

use std::io::{Read, Write};

use fxhash::{FxHashMap, FxHashSet};

use crate::equiv::EquivClasses;
use crate::error::Error;
use crate::sweep::SweepResult;

const TAG_EQUIV: u8 = b'e';
const TAG_MAPPING: u8 = b'm';

/// One candidate class: a representative and its members with proof status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EquivClass {
    /// Lowest node index of the class
    pub repr: u32,
    /// Other members in ascending index order, with their proved flag
    pub members: Vec<(u32, bool)>,
}

/// Equivalence classes of a graph, ordered by representative index
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EquivTable {
    /// The classes, ascending by representative
    pub classes: Vec<EquivClass>,
}

impl EquivTable {
    /// Gather the proved merges and the surviving candidate classes of a sweep
    pub fn from_sweep(classes: &EquivClasses, result: &SweepResult) -> EquivTable {
        let mut by_repr: FxHashMap<u32, Vec<(u32, bool)>> = FxHashMap::default();
        let proved: FxHashSet<u32> = result.proved.iter().map(|&(n, _)| n).collect();
        for &(n, target) in &result.proved {
            by_repr.entry(target.node()).or_default().push((n, true));
        }
        // Merged nodes dangle but still simulate, so they show up again in
        // classes built after the sweep
        for members in classes.classes() {
            let entry = by_repr.entry(members[0]).or_default();
            entry.extend(
                members[1..]
                    .iter()
                    .filter(|&&m| !proved.contains(&m))
                    .map(|&m| (m, false)),
            );
        }
        let mut table = EquivTable::default();
        for (repr, mut members) in by_repr {
            members.sort_unstable();
            table.classes.push(EquivClass { repr, members });
        }
        table.classes.sort_unstable_by_key(|c| c.repr);
        table
    }
}

/// One mapped cell: its fanin nodes and the node realizing the function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapEntry {
    /// Fanin node indices in ascending order
    pub fanins: Vec<u32>,
    /// Defining node, above every fanin
    pub node: u32,
}

/// Mapping of a graph onto multi-input cells
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MappingTable {
    /// One entry per cell, ascending by defining node
    pub entries: Vec<MapEntry>,
}

/// A decoded record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    /// Equivalence classes
    Equiv(EquivTable),
    /// Cell mapping
    Mapping(MappingTable),
}

fn write_varint<W: Write>(w: &mut W, mut x: u64) -> Result<(), Error> {
    loop {
        let b = (x & 0x7f) as u8;
        x >>= 7;
        if x == 0 {
            w.write_all(&[b])?;
            return Ok(());
        }
        w.write_all(&[b | 0x80])?;
    }
}

fn read_varint<R: Read>(r: &mut R) -> Result<u64, Error> {
    let mut x = 0u64;
    let mut shift = 0;
    loop {
        let mut buf = [0u8; 1];
        if r.read(&mut buf)? == 0 {
            return Err(Error::TruncatedVarint);
        }
        let b = buf[0];
        if shift >= 64 || (shift == 63 && b & 0xfe != 0) {
            return Err(Error::VarintOverflow);
        }
        x |= ((b & 0x7f) as u64) << shift;
        if b & 0x80 == 0 {
            return Ok(x);
        }
        shift += 7;
    }
}

fn as_u32(x: u64) -> Result<u32, Error> {
    u32::try_from(x).map_err(|_| Error::MalformedPayload)
}

/// Write the equivalence classes as one record
pub fn write_equiv<W: Write>(w: &mut W, table: &EquivTable) -> Result<(), Error> {
    let mut payload = Vec::new();
    let mut prev_repr = 0u64;
    for class in &table.classes {
        let repr = class.repr as u64;
        assert!(
            repr >= prev_repr,
            "classes must be sorted by representative"
        );
        write_varint(&mut payload, (repr - prev_repr) << 2 | 1)?;
        prev_repr = repr;
        let mut prev = repr;
        for &(m, proved) in &class.members {
            let m = m as u64;
            assert!(m > prev, "members must be ascending above the representative");
            write_varint(&mut payload, (m - prev) << 2 | (proved as u64) << 1)?;
            prev = m;
        }
    }
    w.write_all(&[TAG_EQUIV])?;
    write_varint(w, payload.len() as u64)?;
    w.write_all(&payload)?;
    Ok(())
}

/// Write the cell mapping as one record
pub fn write_mapping<W: Write>(w: &mut W, table: &MappingTable) -> Result<(), Error> {
    let mut payload = Vec::new();
    for entry in &table.entries {
        write_varint(&mut payload, entry.fanins.len() as u64)?;
        let mut prev = 0u64;
        for (k, &f) in entry.fanins.iter().enumerate() {
            let f = f as u64;
            assert!(k == 0 || f > prev, "fanins must be ascending");
            write_varint(&mut payload, f - prev)?;
            prev = f;
        }
        let node = entry.node as u64;
        assert!(node > prev, "defining node must be above its fanins");
        write_varint(&mut payload, node - prev)?;
    }
    w.write_all(&[TAG_MAPPING])?;
    write_varint(w, payload.len() as u64)?;
    w.write_all(&payload)?;
    Ok(())
}

/// Read the next record, or None at a clean end of stream
pub fn read_record<R: Read>(r: &mut R) -> Result<Option<Record>, Error> {
    let mut tag = [0u8; 1];
    if r.read(&mut tag)? == 0 {
        return Ok(None);
    }
    let len = read_varint(r)? as usize;
    let mut payload = vec![0u8; len];
    r.read_exact(&mut payload)
        .map_err(|_| Error::MalformedPayload)?;
    let mut p = payload.as_slice();
    match tag[0] {
        TAG_EQUIV => Ok(Some(Record::Equiv(read_equiv_payload(&mut p)?))),
        TAG_MAPPING => Ok(Some(Record::Mapping(read_mapping_payload(&mut p)?))),
        t => Err(Error::UnknownTag(t)),
    }
}

fn read_equiv_payload(p: &mut &[u8]) -> Result<EquivTable, Error> {
    let mut table = EquivTable::default();
    let mut prev_repr = 0u64;
    while !p.is_empty() {
        let item = read_varint(p)?;
        let delta = item >> 2;
        if item & 1 != 0 {
            let repr = prev_repr + delta;
            table.classes.push(EquivClass {
                repr: as_u32(repr)?,
                members: Vec::new(),
            });
            prev_repr = repr;
        } else {
            let class = table.classes.last_mut().ok_or(Error::MalformedPayload)?;
            let prev = class.members.last().map_or(class.repr, |&(m, _)| m) as u64;
            if delta == 0 {
                return Err(Error::MalformedPayload);
            }
            let m = as_u32(prev + delta)?;
            class.members.push((m, item & 2 != 0));
        }
    }
    Ok(table)
}

fn read_mapping_payload(p: &mut &[u8]) -> Result<MappingTable, Error> {
    let mut table = MappingTable::default();
    while !p.is_empty() {
        let count = read_varint(p)? as usize;
        let mut fanins = Vec::with_capacity(count);
        let mut prev = 0u64;
        for _ in 0..count {
            prev += read_varint(p)?;
            fanins.push(as_u32(prev)?);
        }
        let delta = read_varint(p)?;
        if delta == 0 {
            return Err(Error::MalformedPayload);
        }
        let node = as_u32(prev + delta)?;
        table.entries.push(MapEntry { fanins, node });
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_equiv() -> EquivTable {
        EquivTable {
            classes: vec![
                EquivClass {
                    repr: 0,
                    members: vec![(3, true), (5, false)],
                },
                EquivClass {
                    repr: 7,
                    members: vec![(9, true)],
                },
            ],
        }
    }

    #[test]
    fn test_equiv_bytes() {
        let mut buf = Vec::new();
        write_equiv(&mut buf, &sample_equiv()).unwrap();
        // tag, length, then one item per id
        assert_eq!(buf, vec![b'e', 5, 1, 14, 8, 29, 10]);
    }

    #[test]
    fn test_equiv_roundtrip() {
        let table = sample_equiv();
        let mut buf = Vec::new();
        write_equiv(&mut buf, &table).unwrap();
        let rec = read_record(&mut buf.as_slice()).unwrap().unwrap();
        assert_eq!(rec, Record::Equiv(table));
        assert!(read_record(&mut &buf[buf.len()..]).unwrap().is_none());
    }

    #[test]
    fn test_mapping_roundtrip() {
        let table = MappingTable {
            entries: vec![
                MapEntry {
                    fanins: vec![2, 5],
                    node: 9,
                },
                MapEntry {
                    fanins: vec![],
                    node: 12,
                },
                MapEntry {
                    fanins: vec![9, 12, 13],
                    node: 20,
                },
            ],
        };
        let mut buf = Vec::new();
        write_mapping(&mut buf, &table).unwrap();
        assert_eq!(&buf[..6], &[b'm', 11, 2, 2, 3, 4]);
        let rec = read_record(&mut buf.as_slice()).unwrap().unwrap();
        assert_eq!(rec, Record::Mapping(table));
    }

    #[test]
    fn test_multiple_records() {
        let mut buf = Vec::new();
        write_equiv(&mut buf, &sample_equiv()).unwrap();
        write_mapping(&mut buf, &MappingTable::default()).unwrap();
        let mut r = buf.as_slice();
        assert!(matches!(read_record(&mut r), Ok(Some(Record::Equiv(_)))));
        assert!(matches!(read_record(&mut r), Ok(Some(Record::Mapping(_)))));
        assert!(matches!(read_record(&mut r), Ok(None)));
    }

    #[test]
    fn test_unknown_tag() {
        let buf = vec![b'z', 0];
        assert!(matches!(
            read_record(&mut buf.as_slice()),
            Err(Error::UnknownTag(b'z'))
        ));
    }

    #[test]
    fn test_truncated_payload() {
        let mut buf = Vec::new();
        write_equiv(&mut buf, &sample_equiv()).unwrap();
        buf.truncate(buf.len() - 2);
        assert!(matches!(
            read_record(&mut buf.as_slice()),
            Err(Error::MalformedPayload)
        ));
    }

    #[test]
    fn test_truncated_varint() {
        // Length varint with its continuation bit set, then nothing
        let buf = vec![b'e', 0x85];
        assert!(matches!(
            read_record(&mut buf.as_slice()),
            Err(Error::TruncatedVarint)
        ));
    }

    #[test]
    fn test_member_before_class() {
        // A member item with no preceding representative
        let buf = vec![b'e', 1, 0b100];
        assert!(matches!(
            read_record(&mut buf.as_slice()),
            Err(Error::MalformedPayload)
        ));
    }

    #[test]
    fn test_table_from_sweep() {
        use crate::aig::Aig;
        use crate::sweep::{fraig_sweep, SweepParams};

        let mut aig = Aig::new();
        let a = aig.add_input();
        let b = aig.add_input();
        let c = aig.add_input();
        let bc = aig.or(b, c);
        let x = aig.and(a, bc);
        let ab = aig.and(a, b);
        let ac = aig.and(a, c);
        let y = aig.or(ab, ac);
        aig.add_output(x);
        aig.add_output(y);
        let result = fraig_sweep(&mut aig, &SweepParams::default());
        let table = crate::sim::random_sim_table(&aig, 8, 3);
        let classes = EquivClasses::from_sim(&aig, &table);
        let equiv = EquivTable::from_sweep(&classes, &result);
        assert!(equiv
            .classes
            .iter()
            .any(|cl| cl.repr == x.node() && cl.members.contains(&(y.node(), true))));
        let mut buf = Vec::new();
        write_equiv(&mut buf, &equiv).unwrap();
        let rec = read_record(&mut buf.as_slice()).unwrap().unwrap();
        assert_eq!(rec, Record::Equiv(equiv));
    }

    #[test]
    fn test_varint_limits() {
        let mut buf = Vec::new();
        write_varint(&mut buf, u64::MAX).unwrap();
        assert_eq!(buf.len(), 10);
        assert_eq!(read_varint(&mut buf.as_slice()).unwrap(), u64::MAX);
        // An 11-byte varint overflows
        let bad = vec![0x80u8; 10];
        assert!(matches!(
            read_varint(&mut bad.as_slice()),
            Err(Error::VarintOverflow)
        ));
    }
}
