//! Sortings: the set of units produced by one sorter (or the ground truth).

use crate::data::{SpikeTrain, TimeBase, UnitId};
use crate::error::{CompareError, Result};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// A borrowed view of one unit of a sorting.
#[derive(Debug, Clone, Copy)]
pub struct Unit<'a> {
    /// Unit identifier.
    pub id: &'a UnitId,
    /// Spike train of the unit.
    pub spike_train: &'a SpikeTrain,
}

/// Mapping from unit id to spike train, sharing one time base.
///
/// Units are kept in ascending `UnitId` order, which fixes the row and
/// column order of every table derived from the sorting.
#[derive(Debug, Clone)]
pub struct Sorting {
    time_base: TimeBase,
    units: BTreeMap<UnitId, SpikeTrain>,
}

impl Sorting {
    /// Create a sorting from `(unit id, spike train)` pairs.
    ///
    /// Fails with `DuplicateUnit` if an id appears twice.
    pub fn new<I>(time_base: TimeBase, units: I) -> Result<Self>
    where
        I: IntoIterator<Item = (UnitId, SpikeTrain)>,
    {
        let mut map = BTreeMap::new();
        for (id, train) in units {
            match map.entry(id) {
                Entry::Occupied(e) => {
                    return Err(CompareError::DuplicateUnit(e.key().to_string()));
                }
                Entry::Vacant(e) => {
                    e.insert(train);
                }
            }
        }
        Ok(Self {
            time_base,
            units: map,
        })
    }

    /// Convenience constructor from raw frames.
    ///
    /// ```
    /// use spike_compare::data::Sorting;
    ///
    /// let sorting = Sorting::from_frames(30000.0, [(0, vec![10, 250]), (1, vec![40])]).unwrap();
    /// assert_eq!(sorting.n_units(), 2);
    /// ```
    pub fn from_frames<I, U>(sampling_frequency: f64, units: I) -> Result<Self>
    where
        I: IntoIterator<Item = (U, Vec<i64>)>,
        U: Into<UnitId>,
    {
        let time_base = TimeBase::new(sampling_frequency)?;
        let units = units
            .into_iter()
            .map(|(id, frames)| Ok((id.into(), SpikeTrain::new(frames)?)))
            .collect::<Result<Vec<_>>>()?;
        Self::new(time_base, units)
    }

    /// Load a sorting from a TSV spike table.
    ///
    /// Expected format: a header row followed by `unit_id<TAB>frame` rows.
    /// Rows may be in any order; frames are sorted per unit. Unit ids that
    /// parse as integers load as `UnitId::Int`, even when they were written
    /// from a `UnitId::Name` such as `"7"`.
    pub fn from_tsv<P: AsRef<Path>>(path: P, time_base: TimeBase) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file), time_base)
    }

    /// Load a sorting from any reader producing the TSV spike table format.
    pub fn from_reader<R: Read>(reader: R, time_base: TimeBase) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut grouped: BTreeMap<UnitId, Vec<i64>> = BTreeMap::new();
        for (row, record) in rdr.records().enumerate() {
            let record = record?;
            let unit_field = record.get(0).unwrap_or("");
            let frame_field = record.get(1).ok_or_else(|| CompareError::InvalidRecord {
                value: unit_field.to_string(),
                row,
                reason: "missing frame column".to_string(),
            })?;
            if unit_field.is_empty() {
                return Err(CompareError::InvalidRecord {
                    value: frame_field.to_string(),
                    row,
                    reason: "empty unit id".to_string(),
                });
            }
            let frame: i64 = frame_field.parse().map_err(|_| CompareError::InvalidRecord {
                value: frame_field.to_string(),
                row,
                reason: "frame is not an integer".to_string(),
            })?;
            let unit: UnitId = match unit_field.parse() {
                Ok(id) => id,
                Err(never) => match never {},
            };
            grouped.entry(unit).or_default().push(frame);
        }

        let units = grouped
            .into_iter()
            .map(|(id, mut frames)| {
                frames.sort_unstable();
                Ok((id, SpikeTrain::new(frames)?))
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(time_base, units)
    }

    /// Write the sorting as a TSV spike table.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        self.to_writer(BufWriter::new(file))
    }

    /// Write the TSV spike table to any writer.
    ///
    /// Ids are written in their `Display` form, so a numeric-looking name
    /// reads back as an integer id.
    pub fn to_writer<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_writer(writer);
        wtr.write_record(["unit_id", "frame"])?;
        for (id, train) in &self.units {
            let id = id.to_string();
            for frame in train.iter() {
                wtr.write_record([id.as_str(), frame.to_string().as_str()])?;
            }
        }
        wtr.flush()?;
        Ok(())
    }

    /// Time base shared by all units.
    #[inline]
    pub fn time_base(&self) -> &TimeBase {
        &self.time_base
    }

    /// Sampling frequency in Hz.
    #[inline]
    pub fn sampling_frequency(&self) -> f64 {
        self.time_base.sampling_frequency()
    }

    /// Number of units.
    #[inline]
    pub fn n_units(&self) -> usize {
        self.units.len()
    }

    /// True if the sorting has no units.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Unit ids in ascending order.
    pub fn unit_ids(&self) -> Vec<UnitId> {
        self.units.keys().cloned().collect()
    }

    /// Whether the sorting has a unit with this id.
    pub fn contains(&self, id: &UnitId) -> bool {
        self.units.contains_key(id)
    }

    /// Spike train of a unit.
    pub fn spike_train(&self, id: &UnitId) -> Option<&SpikeTrain> {
        self.units.get(id)
    }

    /// View of a unit.
    pub fn unit<'a>(&'a self, id: &UnitId) -> Option<Unit<'a>> {
        self.units
            .get_key_value(id)
            .map(|(id, spike_train)| Unit { id, spike_train })
    }

    /// Iterate over units in ascending id order.
    pub fn units(&self) -> impl Iterator<Item = Unit<'_>> + '_ {
        self.units
            .iter()
            .map(|(id, spike_train)| Unit { id, spike_train })
    }

    /// Spike count of every unit, in ascending id order.
    pub fn spike_counts(&self) -> Vec<usize> {
        self.units.values().map(SpikeTrain::len).collect()
    }

    /// Total number of spikes across units.
    pub fn total_spikes(&self) -> usize {
        self.units.values().map(SpikeTrain::len).sum()
    }
}
