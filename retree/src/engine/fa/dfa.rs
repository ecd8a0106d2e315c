use super::{Nfa, START_STATE};
use crate::table::{Automaton, Cell};
use indexmap::IndexMap;
use log::debug;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// 状態番号が 1 から始まり、1 が開始状態となる DFA。
///
/// 行にない入力は受理されない。
#[derive(Debug, Clone)]
pub struct Dfa {
    alphabet: Vec<String>,
    /// `rows[n - 1]` が状態 `n` の遷移。
    rows: Vec<IndexMap<String, usize>>,
    accepting: BTreeSet<usize>,
}

impl Dfa {
    /// 部分集合構成法。DFA の状態は発見順に番号付けする。
    pub fn from_nfa(nfa: &Nfa) -> Self {
        let alphabet = nfa.input_alphabet().to_vec();
        let mut numbers: IndexMap<BTreeSet<usize>, usize> = IndexMap::new();
        let mut rows = Vec::new();
        let mut accepting = BTreeSet::new();

        let initial = nfa.initial_set();
        numbers.insert(initial.clone(), START_STATE);
        let mut queue = VecDeque::from([initial]);

        // キューに入れた時点で番号を振るので、取り出しも番号順
        while let Some(set) = queue.pop_front() {
            let mut row = IndexMap::new();
            for symbol in &alphabet {
                let next = nfa.step(&set, symbol);
                if next.is_empty() {
                    continue;
                }
                let number = match numbers.get(&next) {
                    Some(&n) => n,
                    None => {
                        let n = numbers.len() + 1;
                        numbers.insert(next.clone(), n);
                        queue.push_back(next);
                        n
                    }
                };
                row.insert(symbol.clone(), number);
            }
            rows.push(row);
            if !set.is_disjoint(nfa.accepting()) {
                accepting.insert(rows.len());
            }
        }

        Dfa {
            alphabet,
            rows,
            accepting,
        }
    }

    pub fn num_states(&self) -> usize {
        self.rows.len()
    }

    /// 等価な状態をまとめる。
    ///
    /// 受理状態と非受理状態の分割から始め、変化しなくなるまで分割を細かくする。
    /// 結果は開始状態から幅優先で 1 から番号付けし直す。
    pub fn minimize(&mut self) {
        if self.rows.is_empty() {
            return;
        }

        let mut group: Vec<usize> = (1..=self.rows.len())
            .map(|s| usize::from(self.accepting.contains(&s)))
            .collect();
        let mut count = group.iter().collect::<BTreeSet<_>>().len();
        loop {
            let mut signatures: IndexMap<(usize, Vec<Option<usize>>), usize> = IndexMap::new();
            let next: Vec<usize> = self
                .rows
                .iter()
                .zip(&group)
                .map(|(row, &g)| {
                    let moves = self
                        .alphabet
                        .iter()
                        .map(|symbol| row.get(symbol).map(|&t| group[t - 1]))
                        .collect();
                    let len = signatures.len();
                    *signatures.entry((g, moves)).or_insert(len)
                })
                .collect();
            group = next;
            if signatures.len() == count {
                break;
            }
            count = signatures.len();
        }

        // 開始グループから幅優先で番号を振り直す
        let mut numbers: Vec<Option<usize>> = vec![None; count];
        let mut representatives = vec![0];
        numbers[group[0]] = Some(START_STATE);
        let mut queue = VecDeque::from([0]);
        while let Some(s) = queue.pop_front() {
            for symbol in &self.alphabet {
                if let Some(&t) = self.rows[s].get(symbol) {
                    let g = group[t - 1];
                    if numbers[g].is_none() {
                        representatives.push(t - 1);
                        numbers[g] = Some(representatives.len());
                        queue.push_back(t - 1);
                    }
                }
            }
        }

        let rows: Vec<IndexMap<String, usize>> = representatives
            .iter()
            .map(|&s| {
                self.rows[s]
                    .iter()
                    .filter_map(|(symbol, &t)| Some((symbol.clone(), numbers[group[t - 1]]?)))
                    .collect()
            })
            .collect();
        let accepting = representatives
            .iter()
            .zip(1..)
            .filter(|&(&s, _)| self.accepting.contains(&(s + 1)))
            .map(|(_, n)| n)
            .collect();

        debug!("minimize: {} -> {} states", self.rows.len(), rows.len());
        self.rows = rows;
        self.accepting = accepting;
    }
}

impl Automaton for Dfa {
    fn alphabet(&self) -> Vec<String> {
        self.alphabet.clone()
    }

    fn transition_table(&self) -> BTreeMap<usize, BTreeMap<String, Cell>> {
        (1..)
            .zip(&self.rows)
            .map(|(state, row)| {
                let cells = row
                    .iter()
                    .map(|(symbol, &t)| (symbol.clone(), Cell::Single(t)))
                    .collect();
                (state, cells)
            })
            .collect()
    }

    fn accepting_states(&self) -> BTreeSet<usize> {
        self.accepting.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::fa::to_dfa;

    fn chars(s: &str) -> Vec<String> {
        s.chars().map(String::from).collect()
    }

    fn next(dfa: &Dfa, state: usize, symbol: &str) -> Option<usize> {
        dfa.rows[state - 1].get(symbol).copied()
    }

    fn accepts(dfa: &Dfa, input: &str) -> bool {
        let mut state = START_STATE;
        for symbol in chars(input) {
            match next(dfa, state, &symbol) {
                Some(s) => state = s,
                None => return false,
            }
        }
        dfa.accepting.contains(&state)
    }

    #[test]
    fn test_star() {
        let mut dfa = to_dfa("a*").unwrap();
        assert_eq!(dfa.num_states(), 2);
        assert_eq!(dfa.accepting_states(), BTreeSet::from([1, 2]));
        assert_eq!(next(&dfa, 1, "a"), Some(2));
        assert_eq!(next(&dfa, 2, "a"), Some(2));

        dfa.minimize();
        assert_eq!(dfa.num_states(), 1);
        assert_eq!(dfa.accepting_states(), BTreeSet::from([1]));
        assert_eq!(next(&dfa, 1, "a"), Some(1));
    }

    #[test]
    fn test_alternation() {
        // どちらの枝も同じ NFA 状態で終わる
        let mut dfa = to_dfa("a|b").unwrap();
        assert_eq!(dfa.num_states(), 2);
        assert_eq!(dfa.accepting_states(), BTreeSet::from([2]));

        dfa.minimize();
        assert_eq!(dfa.num_states(), 2);
        let table = dfa.transition_table();
        assert_eq!(table[&1]["a"], Cell::Single(2));
        assert_eq!(table[&1]["b"], Cell::Single(2));
        assert!(table[&2].is_empty());
        assert_eq!(dfa.accepting_states(), BTreeSet::from([2]));
    }

    #[test]
    fn test_minimize_keeps_language() {
        for expr in ["(a|b)*abb", "a(b|c)*d?", "(ab|a)(bc|c)", "a{2,4}", "x+y*"] {
            let original = to_dfa(expr).unwrap();
            let mut minimized = original.clone();
            minimized.minimize();
            assert!(minimized.num_states() <= original.num_states(), "{expr}");
            for input in ["", "a", "ab", "abb", "aabb", "babb", "abc", "abcd", "aaa", "xyy", "y"] {
                assert_eq!(
                    accepts(&original, input),
                    accepts(&minimized, input),
                    "{expr} on {input:?}"
                );
            }
        }
    }

    #[test]
    fn test_classic_minimization() {
        // (a|b)*abb の最小 DFA は 4 状態
        let mut dfa = to_dfa("(a|b)*abb").unwrap();
        dfa.minimize();
        assert_eq!(dfa.num_states(), 4);
        assert!(accepts(&dfa, "aababb"));
        assert!(!accepts(&dfa, "abba"));
    }

    #[test]
    fn test_minimize_is_idempotent() {
        let mut dfa = to_dfa("a(b|c)*d?").unwrap();
        dfa.minimize();
        let once = dfa.transition_table();
        dfa.minimize();
        assert_eq!(dfa.transition_table(), once);
    }
}
