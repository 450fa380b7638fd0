//! Longest common substring of several strings
//!
//! A suffix automaton is built over the first string; every other string is
//! run through it to find, per state, the longest match it reaches. The
//! per-state minimum across strings bounds the common substrings ending there.

use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
struct State {
    len: usize,
    link: Option<usize>,
    next: BTreeMap<char, usize>,
    /// End position in the source of the first occurrence
    first_end: usize,
}

/// Suffix automaton of one string
#[derive(Debug, Clone)]
pub struct SuffixAutomaton {
    states: Vec<State>,
    source: Vec<char>,
}

impl SuffixAutomaton {
    pub fn new(text: &str) -> Self {
        let source: Vec<char> = text.chars().collect();
        let mut sam = SuffixAutomaton {
            states: vec![State::default()],
            source: Vec::new(),
        };
        let mut last = 0;
        for (pos, &c) in source.iter().enumerate() {
            last = sam.extend(last, c, pos);
        }
        sam.source = source;
        sam
    }

    fn extend(&mut self, last: usize, c: char, pos: usize) -> usize {
        let cur = self.states.len();
        self.states.push(State {
            len: self.states[last].len + 1,
            link: None,
            next: BTreeMap::new(),
            first_end: pos,
        });

        let mut p = Some(last);
        while let Some(s) = p {
            if self.states[s].next.contains_key(&c) {
                break;
            }
            self.states[s].next.insert(c, cur);
            p = self.states[s].link;
        }

        let Some(p) = p else {
            self.states[cur].link = Some(0);
            return cur;
        };
        let q = self.states[p].next[&c];
        if self.states[p].len + 1 == self.states[q].len {
            self.states[cur].link = Some(q);
            return cur;
        }

        let clone = self.states.len();
        let mut cloned = self.states[q].clone();
        cloned.len = self.states[p].len + 1;
        self.states.push(cloned);

        let mut walk = Some(p);
        while let Some(s) = walk {
            if self.states[s].next.get(&c) != Some(&q) {
                break;
            }
            self.states[s].next.insert(c, clone);
            walk = self.states[s].link;
        }
        self.states[q].link = Some(clone);
        self.states[cur].link = Some(clone);
        cur
    }

    /// Whether `pattern` occurs in the source
    pub fn contains(&self, pattern: &str) -> bool {
        let mut state = 0;
        for c in pattern.chars() {
            match self.states[state].next.get(&c) {
                Some(&next) => state = next,
                None => return false,
            }
        }
        true
    }

    /// States ordered by decreasing `len`
    fn by_len_desc(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.states.len()).collect();
        order.sort_by(|a, b| self.states[*b].len.cmp(&self.states[*a].len));
        order
    }

    /// Longest match of any substring of `other`, per state
    fn matches(&self, other: &str, order: &[usize]) -> Vec<usize> {
        let mut best = vec![0usize; self.states.len()];
        let (mut state, mut len) = (0usize, 0usize);
        for c in other.chars() {
            while state != 0 && !self.states[state].next.contains_key(&c) {
                state = self.states[state].link.unwrap_or(0);
                len = self.states[state].len;
            }
            if let Some(&next) = self.states[state].next.get(&c) {
                state = next;
                len += 1;
            }
            best[state] = best[state].max(len);
        }
        // A match ending in a state also ends in every suffix-link ancestor
        for &s in order {
            if let Some(link) = self.states[s].link {
                let carried = best[s].min(self.states[link].len);
                best[link] = best[link].max(carried);
            }
        }
        best
    }

    /// Longest substring of the source that also occurs in every `others`.
    ///
    /// Among equally long candidates the one ending earliest in the source wins.
    pub fn longest_common_with<'a>(&self, others: impl IntoIterator<Item = &'a str>) -> String {
        let order = self.by_len_desc();
        let mut bound: Vec<usize> = self.states.iter().map(|s| s.len).collect();
        for other in others {
            for (b, m) in bound.iter_mut().zip(self.matches(other, &order)) {
                *b = (*b).min(m);
            }
        }

        let mut best: Option<(usize, usize)> = None;
        for (s, &len) in bound.iter().enumerate().skip(1) {
            let end = self.states[s].first_end;
            let better = match best {
                None => len > 0,
                Some((best_len, best_end)) => len > best_len || (len == best_len && end < best_end),
            };
            if better {
                best = Some((len, end));
            }
        }

        best.map(|(len, end)| self.source[end + 1 - len..=end].iter().collect())
            .unwrap_or_default()
    }
}

/// Longest substring shared by every string in `strings`
pub fn longest_common_substring<S: AsRef<str>>(strings: &[S]) -> String {
    let Some((first, rest)) = strings.split_first() else {
        return String::new();
    };
    SuffixAutomaton::new(first.as_ref()).longest_common_with(rest.iter().map(|s| s.as_ref()))
}
