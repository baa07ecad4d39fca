use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;

use serde::Serialize;

/// Sequences at least this long get the popular-element heuristic.
const AUTOJUNK_MIN_LEN: usize = 200;

/// A maximal run of equal elements: `a[a..a+size] == b[b..b+size]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Match {
    /// Start in the first sequence.
    pub a: usize,
    /// Start in the second sequence.
    pub b: usize,
    /// Number of matched elements.
    pub size: usize,
}

/// Edit operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tag {
    /// `a[i1..i2] == b[j1..j2]`.
    Equal,
    /// `a[i1..i2]` is replaced by `b[j1..j2]`.
    Replace,
    /// `b[j1..j2]` is inserted at `a[i1]` (`i1 == i2`).
    Insert,
    /// `a[i1..i2]` is removed (`j1 == j2`).
    Delete,
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tag::Equal => write!(f, "equal"),
            Tag::Replace => write!(f, "replace"),
            Tag::Insert => write!(f, "insert"),
            Tag::Delete => write!(f, "delete"),
        }
    }
}

/// One step turning the first sequence into the second, with zero-based
/// half-open ranges on both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Opcode {
    /// Operation kind.
    pub tag: Tag,
    /// Start in the first sequence.
    pub i1: usize,
    /// End (exclusive) in the first sequence.
    pub i2: usize,
    /// Start in the second sequence.
    pub j1: usize,
    /// End (exclusive) in the second sequence.
    pub j2: usize,
}

impl Opcode {
    fn new(tag: Tag, i1: usize, i2: usize, j1: usize, j2: usize) -> Self {
        Self { tag, i1, i2, j1, j2 }
    }
}

/// Longest-matching-block sequence aligner.
///
/// Finds the longest contiguous matching block, then recurses on the
/// pieces to its left and right. This gives "human-looking" diffs and,
/// unlike a greedy line walk, stable tie-breaking: among equally long
/// blocks the one starting earliest in `a`, then earliest in `b`, wins.
///
/// When `b` has at least 200 elements, elements occurring in more than
/// 1% of `b` (plus one) are treated as too popular to anchor a match.
/// They can still extend a match found elsewhere.
///
/// # Examples
///
/// ```
/// use herald_difflens::matcher::{SequenceMatcher, Tag};
///
/// let a = ["a", "b", "c"];
/// let b = ["a", "x", "c"];
/// let ops = SequenceMatcher::new(&a, &b).opcodes();
/// assert_eq!(ops.len(), 3);
/// assert_eq!(ops[1].tag, Tag::Replace);
/// assert_eq!((ops[1].i1, ops[1].i2, ops[1].j1, ops[1].j2), (1, 2, 1, 2));
/// ```
pub struct SequenceMatcher<'s, T> {
    a: &'s [T],
    b: &'s [T],
    b2j: HashMap<&'s T, Vec<usize>>,
}

impl<'s, T: Eq + Hash> SequenceMatcher<'s, T> {
    /// Index `b` and prepare to align `a` against it.
    pub fn new(a: &'s [T], b: &'s [T]) -> Self {
        let mut b2j: HashMap<&'s T, Vec<usize>> = HashMap::new();
        for (j, elt) in b.iter().enumerate() {
            b2j.entry(elt).or_default().push(j);
        }

        let n = b.len();
        if n >= AUTOJUNK_MIN_LEN {
            let ntest = n / 100 + 1;
            let popular: HashSet<&'s T> = b2j
                .iter()
                .filter(|(_, idxs)| idxs.len() > ntest)
                .map(|(elt, _)| *elt)
                .collect();
            for elt in popular {
                b2j.remove(elt);
            }
        }

        Self { a, b, b2j }
    }

    /// Longest matching block in `a[alo..ahi]` and `b[blo..bhi]`.
    ///
    /// Returns a zero-size match at `(alo, blo)` when nothing matches.
    pub fn find_longest_match(&self, alo: usize, ahi: usize, blo: usize, bhi: usize) -> Match {
        let (a, b) = (self.a, self.b);
        let (mut besti, mut bestj, mut bestsize) = (alo, blo, 0usize);

        // j2len[j] = length of the longest match ending with a[i-1] and b[j]
        let mut j2len: HashMap<usize, usize> = HashMap::new();
        for (i, elt) in a.iter().enumerate().take(ahi).skip(alo) {
            let mut next: HashMap<usize, usize> = HashMap::new();
            if let Some(indices) = self.b2j.get(elt) {
                for &j in indices {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let k = j
                        .checked_sub(1)
                        .and_then(|prev| j2len.get(&prev))
                        .copied()
                        .unwrap_or(0)
                        + 1;
                    next.insert(j, k);
                    if k > bestsize {
                        besti = i + 1 - k;
                        bestj = j + 1 - k;
                        bestsize = k;
                    }
                }
            }
            j2len = next;
        }

        // Popular elements never seed a match but may widen one.
        while besti > alo && bestj > blo && a[besti - 1] == b[bestj - 1] {
            besti -= 1;
            bestj -= 1;
            bestsize += 1;
        }
        while besti + bestsize < ahi
            && bestj + bestsize < bhi
            && a[besti + bestsize] == b[bestj + bestsize]
        {
            bestsize += 1;
        }

        Match {
            a: besti,
            b: bestj,
            size: bestsize,
        }
    }

    /// All matching blocks, ordered, with adjacent blocks merged.
    ///
    /// The last entry is always the sentinel `(len(a), len(b), 0)`.
    pub fn matching_blocks(&self) -> Vec<Match> {
        let (la, lb) = (self.a.len(), self.b.len());

        let mut queue = vec![(0, la, 0, lb)];
        let mut blocks = Vec::new();
        while let Some((alo, ahi, blo, bhi)) = queue.pop() {
            let m = self.find_longest_match(alo, ahi, blo, bhi);
            if m.size == 0 {
                continue;
            }
            blocks.push(m);
            if alo < m.a && blo < m.b {
                queue.push((alo, m.a, blo, m.b));
            }
            if m.a + m.size < ahi && m.b + m.size < bhi {
                queue.push((m.a + m.size, ahi, m.b + m.size, bhi));
            }
        }
        blocks.sort();

        let mut merged: Vec<Match> = Vec::with_capacity(blocks.len() + 1);
        let mut cur = Match { a: 0, b: 0, size: 0 };
        for m in blocks {
            if cur.a + cur.size == m.a && cur.b + cur.size == m.b {
                cur.size += m.size;
            } else {
                if cur.size > 0 {
                    merged.push(cur);
                }
                cur = m;
            }
        }
        if cur.size > 0 {
            merged.push(cur);
        }
        merged.push(Match {
            a: la,
            b: lb,
            size: 0,
        });
        merged
    }

    /// Opcodes describing how to turn `a` into `b`.
    ///
    /// Ranges tile both sequences without gaps or overlaps.
    pub fn opcodes(&self) -> Vec<Opcode> {
        let (mut i, mut j) = (0, 0);
        let mut ops = Vec::new();
        for m in self.matching_blocks() {
            let tag = match (i < m.a, j < m.b) {
                (true, true) => Some(Tag::Replace),
                (true, false) => Some(Tag::Delete),
                (false, true) => Some(Tag::Insert),
                (false, false) => None,
            };
            if let Some(tag) = tag {
                ops.push(Opcode::new(tag, i, m.a, j, m.b));
            }
            i = m.a + m.size;
            j = m.b + m.size;
            if m.size > 0 {
                ops.push(Opcode::new(Tag::Equal, m.a, i, m.b, j));
            }
        }
        ops
    }

    /// Opcodes grouped into hunks with up to `context` lines of equal
    /// context around each change. Empty when the sequences are equal.
    pub fn grouped_opcodes(&self, context: usize) -> Vec<Vec<Opcode>> {
        let mut codes = self.opcodes();
        if codes.is_empty() {
            codes.push(Opcode::new(Tag::Equal, 0, 1, 0, 1));
        }

        if let Some(first) = codes.first_mut() {
            if first.tag == Tag::Equal {
                first.i1 = first.i1.max(first.i2.saturating_sub(context));
                first.j1 = first.j1.max(first.j2.saturating_sub(context));
            }
        }
        if let Some(last) = codes.last_mut() {
            if last.tag == Tag::Equal {
                last.i2 = last.i2.min(last.i1 + context);
                last.j2 = last.j2.min(last.j1 + context);
            }
        }

        let mut groups = Vec::new();
        let mut group: Vec<Opcode> = Vec::new();
        for code in codes {
            let Opcode {
                tag,
                mut i1,
                i2,
                mut j1,
                j2,
            } = code;
            if tag == Tag::Equal && i2 - i1 > 2 * context {
                group.push(Opcode::new(
                    tag,
                    i1,
                    i2.min(i1 + context),
                    j1,
                    j2.min(j1 + context),
                ));
                groups.push(std::mem::take(&mut group));
                i1 = i1.max(i2.saturating_sub(context));
                j1 = j1.max(j2.saturating_sub(context));
            }
            group.push(Opcode::new(tag, i1, i2, j1, j2));
        }
        if !group.is_empty() && !(group.len() == 1 && group[0].tag == Tag::Equal) {
            groups.push(group);
        }
        groups
    }
}
