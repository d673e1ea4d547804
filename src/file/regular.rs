//! Defines block-backed regular file content and its random I/O.

use parking_lot::RwLock;

use crate::block::Block;
use crate::disk::HeapDisk;
use crate::error::Result;

/// Content of a regular file: a vector of fixed-size blocks plus the exact
/// byte size.
///
/// The block vector may be shorter than the size implies (sparse tail);
/// reads past the vector but below the size return zeros. The content lock
/// is the file's reader/writer lock of the concurrency model: held for the
/// duration of a single read, write or truncate and never across a call
/// into user code.
pub struct RegularFile {
    content: RwLock<Content>,
}

struct Content {
    blocks: Vec<Block>,
    size: u64,
    open_handles: u32,
    deleted: bool,
}

impl RegularFile {
    pub fn new() -> Self {
        Self {
            content: RwLock::new(Content {
                blocks: Vec::new(),
                size: 0,
                open_handles: 0,
                deleted: false,
            }),
        }
    }

    pub fn size(&self) -> u64 {
        self.content.read().size
    }

    pub fn block_count(&self) -> usize {
        self.content.read().blocks.len()
    }

    /// Reads up to `buf.len()` bytes starting at `pos`.
    ///
    /// Returns `None` at end of file (`pos >= size`); otherwise the number
    /// of bytes copied. Never grows the file.
    pub fn read(&self, pos: u64, buf: &mut [u8]) -> Option<usize> {
        let content = self.content.read();
        if pos >= content.size {
            return None;
        }
        let len = buf.len().min((content.size - pos) as usize);
        if len == 0 {
            return Some(0);
        }
        let block_size = match content.blocks.first() {
            Some(block) => block.len(),
            // Fully sparse file: every byte below the size is a hole.
            None => {
                buf[..len].fill(0);
                return Some(len);
            }
        };

        let mut copied = 0;
        while copied < len {
            let at = pos as usize + copied;
            let index = at / block_size;
            let offset = at % block_size;
            let n = (block_size - offset).min(len - copied);
            match content.blocks.get(index) {
                Some(block) => buf[copied..copied + n].copy_from_slice(&block[offset..offset + n]),
                // Sparse tail reads as zeros.
                None => buf[copied..copied + n].fill(0),
            }
            copied += n;
        }
        Some(len)
    }

    /// Writes `data` at `pos`, growing the file through `disk` as needed.
    ///
    /// The size becomes `max(size, pos + data.len())`. Bytes between the old
    /// size and `pos` read as zeros afterwards.
    pub fn write(&self, pos: u64, data: &[u8], disk: &HeapDisk) -> Result<usize> {
        let mut content = self.content.write();
        Self::write_locked(&mut content, pos, data, disk)
    }

    /// Appends `data` at the live end of file, atomically with respect to
    /// every other writer.
    ///
    /// Returns the position the data landed at.
    pub fn append(&self, data: &[u8], disk: &HeapDisk) -> Result<u64> {
        let mut content = self.content.write();
        let pos = content.size;
        Self::write_locked(&mut content, pos, data, disk)?;
        Ok(pos)
    }

    fn write_locked(content: &mut Content, pos: u64, data: &[u8], disk: &HeapDisk) -> Result<usize> {
        let block_size = disk.block_size();
        let end = pos + data.len() as u64;

        let needed = (end as usize).div_ceil(block_size);
        if needed > content.blocks.len() {
            let missing = needed - content.blocks.len();
            disk.allocate(&mut content.blocks, missing)?;
        }

        let mut written = 0;
        while written < data.len() {
            let at = pos as usize + written;
            let index = at / block_size;
            let offset = at % block_size;
            let n = (block_size - offset).min(data.len() - written);
            content.blocks[index][offset..offset + n].copy_from_slice(&data[written..written + n]);
            written += n;
        }

        if end > content.size {
            content.size = end;
        }
        Ok(written)
    }

    /// Sets the size to `new_size`.
    ///
    /// Shrinking frees the blocks past the new end and zeroes the kept
    /// partial block up to its end; growing allocates nothing (sparse hole).
    pub fn truncate(&self, new_size: u64, disk: &HeapDisk) {
        let mut content = self.content.write();
        if new_size >= content.size {
            content.size = new_size;
            return;
        }

        let block_size = disk.block_size();
        let keep = (new_size as usize).div_ceil(block_size);
        let excess = content.blocks.len().saturating_sub(keep);
        if excess > 0 {
            disk.free(&mut content.blocks, excess);
        }
        let tail = new_size as usize % block_size;
        if tail != 0 {
            if let Some(last) = content.blocks.get_mut(keep - 1) {
                last.zero(tail, block_size - tail);
            }
        }
        content.size = new_size;
    }

    /// Copies this file's content into `target`, which must be empty.
    ///
    /// Blocks are copied one by one; the copy is charged to the disk.
    pub fn copy_content(&self, target: &RegularFile, disk: &HeapDisk) -> Result<()> {
        let source = self.content.read();
        let mut dest = target.content.write();
        debug_assert!(dest.blocks.is_empty() && dest.size == 0);

        disk.allocate(&mut dest.blocks, source.blocks.len())?;
        for (to, from) in dest.blocks.iter_mut().zip(source.blocks.iter()) {
            to[..].copy_from_slice(from);
        }
        dest.size = source.size;
        Ok(())
    }

    /// Records a newly opened handle on this file.
    pub fn opened(&self) {
        self.content.write().open_handles += 1;
    }

    /// Records a handle close, releasing the blocks when the file is both
    /// unlinked and no longer open.
    pub fn closed(&self, disk: &HeapDisk) {
        let mut content = self.content.write();
        debug_assert!(content.open_handles > 0);
        content.open_handles -= 1;
        if content.open_handles == 0 && content.deleted {
            Self::release(&mut content, disk);
        }
    }

    /// Marks the file as having no remaining directory entries.
    ///
    /// Blocks are released immediately when nothing holds the file open,
    /// otherwise on the last close.
    pub fn mark_deleted(&self, disk: &HeapDisk) {
        let mut content = self.content.write();
        content.deleted = true;
        if content.open_handles == 0 {
            Self::release(&mut content, disk);
        }
    }

    fn release(content: &mut Content, disk: &HeapDisk) {
        let count = content.blocks.len();
        disk.free(&mut content.blocks, count);
        content.size = 0;
    }
}

impl Default for RegularFile {
    fn default() -> Self {
        Self::new()
    }
}
