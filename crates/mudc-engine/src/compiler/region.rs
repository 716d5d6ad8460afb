//! Region connectivity: the indirect table and its two-pass resolver.
//!
//! Pass one happens during object instantiation: compass links, extra
//! neighbors and rotation are recorded verbatim, keyed by the region's
//! object number, so forward references to regions that do not exist yet
//! are legal. Pass two (`resolve`) runs after the whole program: it
//! backfills missing reciprocal links, reports asymmetric ones, merges
//! neighbor lists, and rotates logical compass slots into the physical
//! slot order each region's hardware table uses.

use rustc_hash::FxHashMap;

/// A logical compass direction, in the fixed slot order of the machine's
/// indirect table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Direction {
    West = 0,
    North = 1,
    East = 2,
    South = 3,
}

pub const DIRECTIONS: [Direction; 4] =
    [Direction::West, Direction::North, Direction::East, Direction::South];

impl Direction {
    pub fn opposite(self) -> Direction {
        DIRECTIONS[(self as usize + 2) % 4]
    }

    /// The physical table slot this logical direction lands in for a
    /// region rotated by `rotation` quarter-turns.
    pub fn physical_slot(self, rotation: u8) -> usize {
        (self as usize + rotation as usize) % 4
    }

    pub fn name(self) -> &'static str {
        match self {
            Direction::West => "west",
            Direction::North => "north",
            Direction::East => "east",
            Direction::South => "south",
        }
    }

    /// Parse a compass-property name.
    pub fn from_name(name: &str) -> Option<Direction> {
        match name {
            "west" => Some(Direction::West),
            "north" => Some(Direction::North),
            "east" => Some(Direction::East),
            "south" => Some(Direction::South),
            _ => None,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Raw per-region connectivity as written in the source. Logical
/// compass space; rotation not yet applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndirectEntry {
    /// Logical neighbors, `None` where the source said nothing.
    pub neighbors: [Option<u8>; 4],
    /// Quarter-turns of this region relative to compass north.
    pub rotation: u8,
    /// Extra neighbors beyond the four compass slots.
    pub multi: Vec<u8>,
}

/// A resolved region row: physical slot order, -1 for no neighbor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRegion {
    pub noid: u8,
    /// Indexed by physical slot; -1 marks an unconnected side.
    pub neighbors: [i16; 4],
    pub rotation: u8,
    pub multi: Vec<u8>,
}

/// One-directional link found during resolution: `region` points at
/// `declared` on `direction`, but the facing side of `declared` points
/// at `found` instead. The declared link is kept as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asymmetry {
    pub region: u8,
    pub direction: Direction,
    pub declared: u8,
    pub found: u8,
}

impl std::fmt::Display for Asymmetry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "region {} links {} to region {}, but that region's {} side links to region {}",
            self.region,
            self.direction,
            self.declared,
            self.direction.opposite(),
            self.found
        )
    }
}

/// The indirect table built during pass one.
#[derive(Debug, Clone, Default)]
pub struct IndirectTable {
    entries: FxHashMap<u8, IndirectEntry>,
}

impl IndirectTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, noid: u8) -> Option<&IndirectEntry> {
        self.entries.get(&noid)
    }

    fn entry_mut(&mut self, noid: u8) -> &mut IndirectEntry {
        self.entries.entry(noid).or_default()
    }

    /// Record a compass link as written. Later records for the same
    /// slot overwrite earlier ones, matching assignment order.
    pub fn record_link(&mut self, noid: u8, direction: Direction, neighbor: u8) {
        self.entry_mut(noid).neighbors[direction as usize] = Some(neighbor);
    }

    pub fn record_rotation(&mut self, noid: u8, rotation: u8) {
        self.entry_mut(noid).rotation = rotation % 4;
    }

    /// Append an extra neighbor, keeping the list duplicate-free.
    pub fn record_multi(&mut self, noid: u8, neighbor: u8) {
        let multi = &mut self.entry_mut(noid).multi;
        if !multi.contains(&neighbor) {
            multi.push(neighbor);
        }
    }

    /// Pass two. Consumes the raw table and produces the physical rows
    /// plus every asymmetry found. Deterministic: regions are processed
    /// in ascending noid order.
    pub fn resolve(mut self) -> (Vec<ResolvedRegion>, Vec<Asymmetry>) {
        let mut asymmetries = Vec::new();

        // Reciprocal backfill happens in logical compass space, before
        // rotation; compass directions are global, rotation is per-region.
        let noids: Vec<u8> = {
            let mut v: Vec<u8> = self.entries.keys().copied().collect();
            v.sort_unstable();
            v
        };
        for &noid in &noids {
            for direction in DIRECTIONS {
                let Some(neighbor) = self.entries[&noid].neighbors[direction as usize] else {
                    continue;
                };
                let facing = direction.opposite();
                let entry = self.entry_mut(neighbor);
                match entry.neighbors[facing as usize] {
                    None => entry.neighbors[facing as usize] = Some(noid),
                    Some(found) if found != noid => asymmetries.push(Asymmetry {
                        region: noid,
                        direction,
                        declared: neighbor,
                        found,
                    }),
                    Some(_) => {}
                }
            }
            // Extra neighbors are symmetric too.
            let multi = self.entries[&noid].multi.clone();
            for neighbor in multi {
                let list = &mut self.entry_mut(neighbor).multi;
                if !list.contains(&noid) {
                    list.push(noid);
                }
            }
        }

        // Backfill may have created entries for regions seen only as
        // neighbors; include them in the output.
        let mut resolved: Vec<ResolvedRegion> = self
            .entries
            .into_iter()
            .map(|(noid, entry)| {
                let mut neighbors = [-1i16; 4];
                for direction in DIRECTIONS {
                    if let Some(n) = entry.neighbors[direction as usize] {
                        neighbors[direction.physical_slot(entry.rotation)] = n as i16;
                    }
                }
                ResolvedRegion {
                    noid,
                    neighbors,
                    rotation: entry.rotation,
                    multi: entry.multi,
                }
            })
            .collect();
        resolved.sort_unstable_by_key(|r| r.noid);
        (resolved, asymmetries)
    }
}
