//! Palette banks and the per-scanline active bank table

use bincode::{Decode, Encode};
use retrogfx_common::frontend::{pack_rgb565, unpack_rgb565};
use thiserror::Error;

pub const PALETTE_BANK_COUNT: usize = 8;
pub const PALETTE_BANK_LEN: usize = 256;

pub type PaletteBank = [u16; PALETTE_BANK_LEN];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PaletteError {
    #[error("Palette bank {0} is out of range (max {max})", max = PALETTE_BANK_COUNT - 1)]
    BankOutOfRange(usize),
}

fn check_bank(bank: usize) -> Result<(), PaletteError> {
    if bank < PALETTE_BANK_COUNT { Ok(()) } else { Err(PaletteError::BankOutOfRange(bank)) }
}

#[derive(Debug, Clone, Encode, Decode)]
pub struct PaletteBanks {
    banks: [PaletteBank; PALETTE_BANK_COUNT],
    line_banks: Vec<u8>,
}

impl PaletteBanks {
    #[must_use]
    pub fn new(screen_height: u32) -> Self {
        Self {
            banks: [[0; PALETTE_BANK_LEN]; PALETTE_BANK_COUNT],
            line_banks: vec![0; screen_height as usize],
        }
    }

    /// Bank used by the given screen row. Rows outside the screen use bank 0.
    #[inline]
    #[must_use]
    pub fn for_line(&self, line: i32) -> &PaletteBank {
        let bank = usize::try_from(line)
            .ok()
            .and_then(|line| self.line_banks.get(line).copied())
            .unwrap_or(0);
        self.banks.get(bank as usize).unwrap_or(&self.banks[0])
    }

    #[inline]
    #[must_use]
    pub fn line_bank_id(&self, line: usize) -> u8 {
        self.line_banks.get(line).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn bank(&self, bank: usize) -> Option<&PaletteBank> {
        self.banks.get(bank)
    }

    /// # Errors
    ///
    /// Returns an error if `bank` is out of range.
    pub fn load_bank(&mut self, bank: usize, colors: &[u16]) -> Result<(), PaletteError> {
        check_bank(bank)?;

        let len = colors.len().min(PALETTE_BANK_LEN);
        self.banks[bank][..len].copy_from_slice(&colors[..len]);

        log::debug!("Loaded {len} colors into palette bank {bank}");

        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if `bank` is out of range.
    pub fn set_entry(
        &mut self,
        bank: usize,
        index: u8,
        r: u8,
        g: u8,
        b: u8,
    ) -> Result<(), PaletteError> {
        check_bank(bank)?;
        self.banks[bank][index as usize] = pack_rgb565(r, g, b);
        Ok(())
    }

    /// Set an entry from a packed `0xRRGGBB` color.
    ///
    /// # Errors
    ///
    /// Returns an error if `bank` is out of range.
    pub fn set_entry_packed(&mut self, bank: usize, index: u8, rgb: u32) -> Result<(), PaletteError> {
        self.set_entry(bank, index, (rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)
    }

    /// Read an entry back as packed `0xRRGGBB`.
    ///
    /// # Errors
    ///
    /// Returns an error if `bank` is out of range.
    pub fn entry_packed(&self, bank: usize, index: u8) -> Result<u32, PaletteError> {
        check_bank(bank)?;
        let (r, g, b) = unpack_rgb565(self.banks[bank][index as usize]);
        Ok((u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b))
    }

    /// Copy `count` colors between banks. The copy is truncated at the end of either bank.
    ///
    /// # Errors
    ///
    /// Returns an error if either bank is out of range.
    pub fn copy(
        &mut self,
        src_bank: usize,
        src_start: u8,
        dst_bank: usize,
        dst_start: u8,
        count: usize,
    ) -> Result<(), PaletteError> {
        check_bank(src_bank)?;
        check_bank(dst_bank)?;

        let src_start = src_start as usize;
        let dst_start = dst_start as usize;
        let count = count.min(PALETTE_BANK_LEN - src_start).min(PALETTE_BANK_LEN - dst_start);

        let src = self.banks[src_bank];
        self.banks[dst_bank][dst_start..dst_start + count]
            .copy_from_slice(&src[src_start..src_start + count]);

        Ok(())
    }

    /// Rotate the colors in `start..=end` by one position.
    ///
    /// # Errors
    ///
    /// Returns an error if `bank` is out of range.
    pub fn rotate(&mut self, bank: usize, start: u8, end: u8, right: bool) -> Result<(), PaletteError> {
        check_bank(bank)?;

        if start >= end {
            return Ok(());
        }

        let range = &mut self.banks[bank][start as usize..=end as usize];
        if right {
            range.rotate_right(1);
        } else {
            range.rotate_left(1);
        }

        Ok(())
    }

    /// Select the bank used by screen rows `start_line..end_line`, clipped to the screen.
    ///
    /// # Errors
    ///
    /// Returns an error if `bank` is out of range.
    pub fn set_active(&mut self, bank: usize, start_line: u32, end_line: u32) -> Result<(), PaletteError> {
        check_bank(bank)?;

        let end = (end_line as usize).min(self.line_banks.len());
        let start = (start_line as usize).min(end);
        self.line_banks[start..end].fill(bank as u8);

        Ok(())
    }

    /// Write a blend of banks `src_a` and `src_b` into `dst` for indices `start..=end`.
    ///
    /// An `amount` of 0 yields `src_a`, and amounts of 255 and above yield (almost exactly)
    /// `src_b`.
    ///
    /// # Errors
    ///
    /// Returns an error if any bank is out of range.
    pub fn fade(
        &mut self,
        dst: usize,
        src_a: usize,
        src_b: usize,
        amount: u16,
        start: u8,
        end: u8,
    ) -> Result<(), PaletteError> {
        check_bank(dst)?;
        check_bank(src_a)?;
        check_bank(src_b)?;

        if start >= end {
            return Ok(());
        }

        let amount = u32::from(amount.min(0xFF));
        for i in start as usize..=end as usize {
            let a = unpack_rgb565(self.banks[src_a][i]);
            let b = unpack_rgb565(self.banks[src_b][i]);
            self.banks[dst][i] = blend_channels(a, b, amount);
        }

        Ok(())
    }

    /// Blend indices `start..=end` of `bank` toward a fixed color.
    ///
    /// # Errors
    ///
    /// Returns an error if `bank` is out of range.
    pub fn limited_fade(
        &mut self,
        bank: usize,
        r: u8,
        g: u8,
        b: u8,
        amount: u16,
        start: u8,
        end: u8,
    ) -> Result<(), PaletteError> {
        check_bank(bank)?;

        if start >= end {
            return Ok(());
        }

        let amount = u32::from(amount.min(0xFF));
        for i in start as usize..=end as usize {
            let current = unpack_rgb565(self.banks[bank][i]);
            self.banks[bank][i] = blend_channels(current, (r, g, b), amount);
        }

        Ok(())
    }
}

fn blend_channels(a: (u8, u8, u8), b: (u8, u8, u8), amount: u32) -> u16 {
    let inverse = 0xFF - amount;
    let mix = |a: u8, b: u8| ((amount * u32::from(b) + inverse * u32::from(a)) >> 8) as u8;
    pack_rgb565(mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
}
