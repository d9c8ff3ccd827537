// Evsense Input Layer - Capability Bitmasks
// Bounded bitmask storage and pure bit-test helpers

const WORD_BITS: usize = u64::BITS as usize;

/// Number of 64-bit words needed to hold `bits` bits.
pub const fn words_for(bits: usize) -> usize {
    bits.div_ceil(WORD_BITS)
}

/// Test a single bit in a bitmask view. Out-of-range bits read as unset.
pub fn bit_is_set(words: &[u64], bit: usize) -> bool {
    words
        .get(bit / WORD_BITS)
        .map(|w| (w >> (bit % WORD_BITS)) & 1 == 1)
        .unwrap_or(false)
}

/// Count the set bits in a bitmask view.
pub fn count_set(words: &[u64]) -> usize {
    words.iter().map(|w| w.count_ones() as usize).sum()
}

/// Fixed-capacity owned bitmask, sized for a kernel `*_MAX` code range.
///
/// Setting a bit beyond the capacity is ignored rather than growing the
/// storage, so a misbehaving source cannot inflate the mask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitMask {
    words: Vec<u64>,
    capacity: usize,
}

impl BitMask {
    /// Create an empty mask able to hold codes `0..=max_code`
    pub fn new(max_code: u16) -> Self {
        let capacity = max_code as usize + 1;
        Self {
            words: vec![0; words_for(capacity)],
            capacity,
        }
    }

    /// Create a mask from a list of set codes
    pub fn from_codes(max_code: u16, codes: impl IntoIterator<Item = u16>) -> Self {
        let mut mask = Self::new(max_code);
        for code in codes {
            mask.set(code);
        }
        mask
    }

    pub fn set(&mut self, code: u16) {
        let bit = code as usize;
        if bit < self.capacity {
            self.words[bit / WORD_BITS] |= 1 << (bit % WORD_BITS);
        }
    }

    pub fn contains(&self, code: u16) -> bool {
        bit_is_set(&self.words, code as usize)
    }

    pub fn count(&self) -> usize {
        count_set(&self.words)
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    /// Iterate the set codes in ascending order
    pub fn iter(&self) -> impl Iterator<Item = u16> + '_ {
        (0..self.capacity)
            .filter(|bit| bit_is_set(&self.words, *bit))
            .map(|bit| bit as u16)
    }

    /// Little-endian byte image of the mask, as the kernel would hand it out
    pub fn to_le_bytes(&self) -> Vec<u8> {
        self.words.iter().flat_map(|w| w.to_le_bytes()).collect()
    }
}
