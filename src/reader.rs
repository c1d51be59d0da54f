//! Word fetching.
//!
//! The decoder reads its input through [`WordSource`], one little-endian
//! 16-bit word at a time. [`Cursor`] tracks how many bytes of the current
//! instruction have been consumed.

use crate::error::{DecodeError, Result};
use byteorder::{ByteOrder, LittleEndian};

/// Addressable source of 16-bit instruction words.
pub trait WordSource {
    /// Read the word at `address`.
    ///
    /// Fails with [`DecodeError::OutOfBounds`] when fewer than two bytes
    /// are available there.
    fn read_word(&self, address: u32) -> Result<u16>;
}

impl<T: WordSource + ?Sized> WordSource for &T {
    fn read_word(&self, address: u32) -> Result<u16> {
        (**self).read_word(address)
    }
}

/// A raw memory image loaded at a base address.
#[derive(Debug, Clone, Copy)]
pub struct Image<'a> {
    base: u32,
    bytes: &'a [u8],
}

impl<'a> Image<'a> {
    /// Wrap `bytes` so that the first byte lives at `base`.
    pub fn new(base: u32, bytes: &'a [u8]) -> Self {
        Self { base, bytes }
    }

    /// Address of the first byte.
    pub fn base(&self) -> u32 {
        self.base
    }

    /// Address one past the last byte.
    pub fn end(&self) -> u64 {
        u64::from(self.base) + self.bytes.len() as u64
    }

    /// Number of bytes in the image.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// True if the image holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Bytes in `[address, address + len)`, if fully inside the image.
    pub fn slice(&self, address: u32, len: usize) -> Option<&'a [u8]> {
        let start = address.checked_sub(self.base)? as usize;
        self.bytes.get(start..start.checked_add(len)?)
    }
}

impl WordSource for Image<'_> {
    fn read_word(&self, address: u32) -> Result<u16> {
        self.slice(address, 2)
            .map(LittleEndian::read_u16)
            .ok_or(DecodeError::OutOfBounds { address })
    }
}

/// Decode cursor over one instruction.
#[derive(Debug)]
pub struct Cursor<'a, S: ?Sized> {
    source: &'a S,
    start: u32,
    size: u8,
}

impl<'a, S: WordSource + ?Sized> Cursor<'a, S> {
    /// Start reading an instruction at `start`.
    pub fn new(source: &'a S, start: u32) -> Self {
        Self {
            source,
            start,
            size: 0,
        }
    }

    /// Read the next word and advance by two bytes.
    pub fn fetch(&mut self) -> Result<u16> {
        let word = self.source.read_word(self.position())?;
        self.size += 2;
        Ok(word)
    }

    /// Instruction start address.
    pub fn start(&self) -> u32 {
        self.start
    }

    /// Bytes consumed so far.
    pub fn size(&self) -> u8 {
        self.size
    }

    /// Address of the next word to be fetched.
    pub fn position(&self) -> u32 {
        self.start.wrapping_add(u32::from(self.size))
    }
}
