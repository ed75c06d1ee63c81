//! Fixed-layout row and the data pages that hold them.
//!
//! Grounded in the original `storage/data_block.h`/`data_block.cpp`: a
//! `Record` is read/written field-by-field through the [`crate::serialize`]
//! primitives with no framing, and a `DataBlock` is just records packed
//! back-to-back until the page is full.

use crate::error::Result;
use crate::serialize;
use std::io::{Read, Write};

/// 27 bytes of payload, field order fixed by the wire format in the spec.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Record {
    pub game_date_est: u32,
    pub team_id_home: u32,
    pub fg_pct_home: f32,
    pub ft_pct_home: f32,
    pub fg3_pct_home: f32,
    pub ast_home: u16,
    pub reb_home: u16,
    pub pts_home: u16,
    pub home_team_wins: bool,
}

impl Record {
    /// Size on the wire. There is no struct padding to worry about since the
    /// wire format is written field-by-field, not `memcpy`'d whole.
    pub const SIZE: usize = 4 + 4 + 4 + 4 + 4 + 2 + 2 + 2 + 1;

    pub fn write_to(&self, w: &mut impl Write) -> Result<usize> {
        let mut n = 0;
        n += serialize::write_u32(w, self.game_date_est)?;
        n += serialize::write_u32(w, self.team_id_home)?;
        n += serialize::write_f32(w, self.fg_pct_home)?;
        n += serialize::write_f32(w, self.ft_pct_home)?;
        n += serialize::write_f32(w, self.fg3_pct_home)?;
        n += serialize::write_u16(w, self.ast_home)?;
        n += serialize::write_u16(w, self.reb_home)?;
        n += serialize::write_u16(w, self.pts_home)?;
        n += serialize::write_bool(w, self.home_team_wins)?;
        Ok(n)
    }

    pub fn read_from(r: &mut impl Read) -> Result<Self> {
        Ok(Record {
            game_date_est: serialize::read_u32(r)?,
            team_id_home: serialize::read_u32(r)?,
            fg_pct_home: serialize::read_f32(r)?,
            ft_pct_home: serialize::read_f32(r)?,
            fg3_pct_home: serialize::read_f32(r)?,
            ast_home: serialize::read_u16(r)?,
            reb_home: serialize::read_u16(r)?,
            pts_home: serialize::read_u16(r)?,
            home_team_wins: serialize::read_bool(r)?,
        })
    }
}

/// A stable reference into a data block: which block, and the record's
/// position within that block's `records` vector. Offsets are never
/// reassigned once written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordPointer {
    pub block_id: i32,
    pub offset: u16,
}

/// A page of records. The block id is carried out-of-band by the
/// [`crate::block_store::BlockStore`] (it is the file name); the serialized
/// payload is only the records, back-to-back, with no framing.
#[derive(Debug, Clone, PartialEq)]
pub struct DataBlock {
    pub id: i32,
    pub records: Vec<Record>,
}

impl DataBlock {
    pub fn new(id: i32) -> Self {
        DataBlock {
            id,
            records: Vec::new(),
        }
    }

    pub fn max_records_per_block(page_size: usize) -> usize {
        page_size / Record::SIZE
    }
}

impl crate::block_store::Page for DataBlock {
    fn id(&self) -> i32 {
        self.id
    }

    fn set_id(&mut self, id: i32) {
        self.id = id;
    }

    /// Reads records until the stream is exhausted. The truncated final
    /// block is written and read with its exact physical length, so a short
    /// final record read (not landing on a record boundary) is corruption.
    fn from_reader(id: i32, r: &mut impl Read) -> Result<Self> {
        let mut buf = Vec::new();
        r.read_to_end(&mut buf)?;
        let mut cursor = std::io::Cursor::new(&buf[..]);
        let mut records = Vec::new();
        while (cursor.position() as usize) < buf.len() {
            records.push(Record::read_from(&mut cursor)?);
        }
        Ok(DataBlock { id, records })
    }

    fn write_to(&self, w: &mut impl Write) -> Result<()> {
        for record in &self.records {
            record.write_to(w)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(fg: f32) -> Record {
        Record {
            game_date_est: 20230115,
            team_id_home: 1610612737,
            fg_pct_home: fg,
            ft_pct_home: 0.8,
            fg3_pct_home: 0.4,
            ast_home: 25,
            reb_home: 44,
            pts_home: 110,
            home_team_wins: true,
        }
    }

    #[test]
    fn record_round_trips() {
        let r = sample(0.55);
        let mut buf = Vec::new();
        let n = r.write_to(&mut buf).unwrap();
        assert_eq!(n, Record::SIZE);
        assert_eq!(buf.len(), Record::SIZE);
        let mut cursor = std::io::Cursor::new(&buf[..]);
        let back = Record::read_from(&mut cursor).unwrap();
        assert_eq!(r, back);
    }

    #[test]
    fn data_block_round_trips_with_truncated_final_block() {
        use crate::block_store::Page;
        let mut block = DataBlock::new(3);
        block.records.push(sample(0.1));
        block.records.push(sample(0.9));
        let mut buf = Vec::new();
        block.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), 2 * Record::SIZE);

        let mut cursor = std::io::Cursor::new(&buf[..]);
        let back = DataBlock::from_reader(3, &mut cursor).unwrap();
        assert_eq!(back, block);
    }

    #[test]
    fn max_records_per_block_floors() {
        assert_eq!(DataBlock::max_records_per_block(4096), 4096 / Record::SIZE);
    }
}
