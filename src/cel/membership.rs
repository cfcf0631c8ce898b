//! Fixed-size bitset keyed by catalog position.
//!
//! Every operator reduces to set algebra on these; materializing walks the
//! bits in ascending position, which is catalog order.

const WORD: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Membership {
    words: Vec<u64>,
    len: usize,
}

impl Membership {
    /// No position set.
    pub fn empty(len: usize) -> Self {
        Self { words: vec![0; len.div_ceil(WORD)], len }
    }

    /// Every position set.
    pub fn full(len: usize) -> Self {
        let mut set = Self { words: vec![u64::MAX; len.div_ceil(WORD)], len };
        set.clear_tail();
        set
    }

    pub fn from_positions(len: usize, positions: impl IntoIterator<Item = usize>) -> Self {
        let mut set = Self::empty(len);
        for position in positions {
            set.insert(position);
        }
        set
    }

    /// Domain size, i.e. the catalog length.
    pub fn capacity(&self) -> usize {
        self.len
    }

    /// Positions outside the domain are ignored.
    pub fn insert(&mut self, position: usize) {
        if position < self.len {
            self.words[position / WORD] |= 1u64 << (position % WORD);
        }
    }

    pub fn contains(&self, position: usize) -> bool {
        position < self.len && self.words[position / WORD] & (1u64 << (position % WORD)) != 0
    }

    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn union_with(&mut self, other: &Membership) {
        for (a, b) in self.words.iter_mut().zip(&other.words) {
            *a |= b;
        }
    }

    pub fn intersect_with(&mut self, other: &Membership) {
        for (a, b) in self.words.iter_mut().zip(&other.words) {
            *a &= b;
        }
    }

    /// Complement within the whole domain.
    pub fn complement(&mut self) {
        for word in &mut self.words {
            *word = !*word;
        }
        self.clear_tail();
    }

    /// Set positions in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(index, &word)| {
            let mut remaining = word;
            std::iter::from_fn(move || {
                if remaining == 0 {
                    return None;
                }
                let bit = remaining.trailing_zeros() as usize;
                remaining &= remaining - 1;
                Some(index * WORD + bit)
            })
        })
    }

    fn clear_tail(&mut self) {
        let used = self.len % WORD;
        if used != 0 {
            if let Some(last) = self.words.last_mut() {
                *last &= (1u64 << used) - 1;
            }
        }
    }
}
