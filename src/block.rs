//! Row-oriented block store (spec C6): a growable arena of
//! fixed-size row blocks, addressed linearly, flattened to a
//! contiguous buffer on completion. Ported from
//! `examples/original_source/src/blocks.c`.
//!
//! Per the REDESIGN FLAGS note about the block-store-vs-known-size
//! duplication in the source, both destinations a finished read can
//! write into — a block store of unknown final length, or a
//! caller-sized buffer known up front — are unified behind the
//! [`Sink`] trait so `reader.rs` has one code path regardless of
//! which `Request` shape it was given.

pub const DEFAULT_ROWS_PER_BLOCK: usize = 500;
pub const DEFAULT_BLOCK_TABLE_LENGTH: usize = 200;

/// A paged arena of `row_size`-byte rows, `rows_per_block` rows per
/// block, growing the block-pointer table by doubling.
pub struct BlockStore {
    row_size: usize,
    rows_per_block: usize,
    blocks: Vec<Option<Vec<u8>>>,
}

impl BlockStore {
    pub fn new(row_size: usize, rows_per_block: usize, initial_table_length: usize) -> Self {
        let mut blocks = Vec::with_capacity(initial_table_length);
        blocks.resize_with(initial_table_length, || None);
        BlockStore {
            row_size,
            rows_per_block: rows_per_block.max(1),
            blocks,
        }
    }

    pub fn with_defaults(row_size: usize) -> Self {
        BlockStore::new(row_size, DEFAULT_ROWS_PER_BLOCK, DEFAULT_BLOCK_TABLE_LENGTH)
    }

    pub fn row_size(&self) -> usize {
        self.row_size
    }

    /// Return a mutable slice of `row_size` bytes for row `k`,
    /// allocating the enclosing block and/or growing the block-pointer
    /// table as needed.
    pub fn get_row_mut(&mut self, k: usize) -> &mut [u8] {
        let block_number = k / self.rows_per_block;
        let block_offset = k % self.rows_per_block;

        if block_number >= self.blocks.len() {
            let mut new_len = self.blocks.len() * 2;
            if new_len == 0 {
                new_len = DEFAULT_BLOCK_TABLE_LENGTH;
            }
            if block_number >= new_len {
                new_len = block_number + 1;
            }
            self.blocks.resize_with(new_len, || None);
        }

        let block_size = self.row_size * self.rows_per_block;
        let block = self.blocks[block_number].get_or_insert_with(|| vec![0u8; block_size]);
        let start = block_offset * self.row_size;
        &mut block[start..start + self.row_size]
    }

    /// Reallocate every non-null block at a new, larger row size,
    /// preserving the bytes already written into the first
    /// `old_row_size` bytes of each row. Valid only while every row in
    /// the store has the same layout (homogeneous column types).
    pub fn uniform_resize(&mut self, new_row_size: usize) {
        assert!(
            new_row_size >= self.row_size,
            "uniform_resize only grows the row stride"
        );
        if new_row_size == self.row_size {
            return;
        }
        let old_row_size = self.row_size;
        let rows_per_block = self.rows_per_block;
        for block in self.blocks.iter_mut().flatten() {
            let mut new_block = vec![0u8; new_row_size * rows_per_block];
            for r in 0..rows_per_block {
                let old_start = r * old_row_size;
                let new_start = r * new_row_size;
                new_block[new_start..new_start + old_row_size]
                    .copy_from_slice(&block[old_start..old_start + old_row_size]);
            }
            *block = new_block;
        }
        self.row_size = new_row_size;
    }

    /// Copy the first `num_rows` rows into one contiguous buffer.
    pub fn to_contiguous(&self, num_rows: usize) -> Vec<u8> {
        let mut data = vec![0u8; num_rows * self.row_size];
        let full_blocks = num_rows / self.rows_per_block;
        let last_rows = num_rows % self.rows_per_block;
        let block_size = self.row_size * self.rows_per_block;

        for j in 0..full_blocks {
            let block = self.blocks[j].as_deref().unwrap_or(&[]);
            let dest = &mut data[j * block_size..j * block_size + block_size];
            dest[..block.len().min(block_size)].copy_from_slice(&block[..block.len().min(block_size)]);
        }
        if last_rows > 0 {
            let block = self.blocks[full_blocks].as_deref().unwrap_or(&[]);
            let n = last_rows * self.row_size;
            let dest_start = full_blocks * block_size;
            data[dest_start..dest_start + n].copy_from_slice(&block[..n]);
        }
        data
    }
}

/// Destination for decoded row bytes during `read_rows`: either a
/// block store that grows as rows arrive (`limit` unknown or an upper
/// bound only), or a single preallocated buffer (`limit` is exact).
pub enum Sink {
    Growing(BlockStore),
    Preallocated { buf: Vec<u8>, row_size: usize },
}

impl Sink {
    pub fn growing(row_size: usize) -> Self {
        Sink::Growing(BlockStore::with_defaults(row_size))
    }

    pub fn preallocated(row_size: usize, num_rows: usize) -> Self {
        Sink::Preallocated {
            buf: vec![0u8; row_size * num_rows],
            row_size,
        }
    }

    pub fn row_size(&self) -> usize {
        match self {
            Sink::Growing(b) => b.row_size(),
            Sink::Preallocated { row_size, .. } => *row_size,
        }
    }

    pub fn row_mut(&mut self, k: usize) -> &mut [u8] {
        match self {
            Sink::Growing(b) => b.get_row_mut(k),
            Sink::Preallocated { buf, row_size } => {
                let start = k * *row_size;
                &mut buf[start..start + *row_size]
            }
        }
    }

    /// Grow the row stride in place (only valid for homogeneous rows,
    /// and only meaningful for `Growing` — a `Preallocated` sink's
    /// size is fixed by the caller's `Request::limit` and cannot
    /// widen after the fact).
    pub fn uniform_resize(&mut self, new_row_size: usize) {
        if let Sink::Growing(b) = self {
            b.uniform_resize(new_row_size);
        }
    }

    /// Finish the read, producing the final contiguous buffer holding
    /// exactly `num_rows` rows.
    pub fn finish(self, num_rows: usize) -> Vec<u8> {
        match self {
            Sink::Growing(b) => b.to_contiguous(num_rows),
            Sink::Preallocated { mut buf, row_size } => {
                buf.truncate(num_rows * row_size);
                buf
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_row_ptr_grows_table_and_allocates() {
        let mut store = BlockStore::new(4, 2, 1);
        store.get_row_mut(0).copy_from_slice(&[1, 2, 3, 4]);
        store.get_row_mut(1).copy_from_slice(&[5, 6, 7, 8]);
        store.get_row_mut(5).copy_from_slice(&[9, 9, 9, 9]);
        let out = store.to_contiguous(2);
        assert_eq!(out, vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn uniform_resize_preserves_bytes() {
        let mut store = BlockStore::new(2, 4, 2);
        store.get_row_mut(0).copy_from_slice(&[1, 2]);
        store.get_row_mut(1).copy_from_slice(&[3, 4]);
        store.uniform_resize(4);
        assert_eq!(store.row_size(), 4);
        assert_eq!(&store.get_row_mut(0)[..2], &[1, 2]);
        assert_eq!(&store.get_row_mut(1)[..2], &[3, 4]);
    }

    #[test]
    fn to_contiguous_spans_multiple_blocks() {
        let mut store = BlockStore::new(1, 2, 1);
        for k in 0..5 {
            store.get_row_mut(k)[0] = k as u8;
        }
        assert_eq!(store.to_contiguous(5), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn preallocated_sink_round_trip() {
        let mut sink = Sink::preallocated(2, 3);
        sink.row_mut(0).copy_from_slice(&[1, 1]);
        sink.row_mut(1).copy_from_slice(&[2, 2]);
        sink.row_mut(2).copy_from_slice(&[3, 3]);
        assert_eq!(sink.finish(3), vec![1, 1, 2, 2, 3, 3]);
    }
}
