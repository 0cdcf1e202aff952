//! Shell-style wildcard matching.
//!
//! Supported syntax: `*`, `?`, `[...]` / `[^...]` classes with `a-z` ranges,
//! and backslash escapes (`\n`, `\t`, `\r`, `\a`, `\b`, `\f`, `\v`, or any
//! literal character). How `*` treats `/` depends on [`GlobMode`].
//!
//! Matching is recursive backtracking. Patterns may come from rule files or
//! request URIs, so every call carries a step budget; running out of budget
//! is reported as "no match".

use serde::{Deserialize, Serialize};

/// How `*` interacts with the `/` separator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GlobMode {
    /// `*` matches anything, `/` included.
    #[default]
    Lexical,
    /// `*` and `?` never match `/`.
    Path,
    /// Like [`GlobMode::Path`], but `**` may cross `/`.
    #[serde(alias = "globstar")]
    PathDoubleStar,
}

const MAX_STEPS: usize = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Match,
    NoMatch,
    /// Give up the whole match: the name ran out, or the pattern is malformed,
    /// or the step budget is spent. Consuming more input elsewhere cannot help.
    Abort,
}

struct Matcher {
    pattern: Vec<char>,
    name: Vec<char>,
    mode: GlobMode,
    steps: usize,
}

/// True iff `pattern` matches the whole of `name` under `mode`.
pub fn match_glob(pattern: &str, name: &str, mode: GlobMode) -> bool {
    let mut matcher = Matcher {
        pattern: pattern.chars().collect(),
        name: name.chars().collect(),
        mode,
        steps: 0,
    };
    matcher.run(0, 0) == Outcome::Match
}

/// Whether `s` contains any character with glob meaning.
pub fn has_glob_meta(s: &str) -> bool {
    s.contains(['*', '?', '[', '\\'])
}

impl Matcher {
    fn run(&mut self, mut p: usize, mut n: usize) -> Outcome {
        self.steps += 1;
        if self.steps > MAX_STEPS {
            return Outcome::Abort;
        }

        while p < self.pattern.len() {
            if n == self.name.len() && self.pattern[p] != '*' {
                return Outcome::Abort;
            }
            match self.pattern[p] {
                '*' => return self.star(p, n),
                '?' => {
                    if self.mode != GlobMode::Lexical && self.name[n] == '/' {
                        return Outcome::NoMatch;
                    }
                    p += 1;
                    n += 1;
                }
                '[' => match self.class(p, self.name[n]) {
                    Ok(next) => {
                        p = next;
                        n += 1;
                    }
                    Err(outcome) => return outcome,
                },
                '\\' => {
                    let Some(&escaped) = self.pattern.get(p + 1) else {
                        return Outcome::Abort;
                    };
                    if self.name[n] != unescape(escaped) {
                        return Outcome::NoMatch;
                    }
                    p += 2;
                    n += 1;
                }
                c => {
                    if self.name[n] != c {
                        return Outcome::NoMatch;
                    }
                    p += 1;
                    n += 1;
                }
            }
        }

        if n == self.name.len() {
            Outcome::Match
        } else {
            Outcome::NoMatch
        }
    }

    /// `pattern[p]` is `*`.
    fn star(&mut self, mut p: usize, n: usize) -> Outcome {
        let run_start = p;
        while p < self.pattern.len() && self.pattern[p] == '*' {
            p += 1;
        }
        let crosses_slash = match self.mode {
            GlobMode::Lexical => true,
            GlobMode::Path => false,
            GlobMode::PathDoubleStar => p - run_start >= 2,
        };

        if p == self.pattern.len() {
            return if crosses_slash || !self.name[n..].contains(&'/') {
                Outcome::Match
            } else {
                Outcome::NoMatch
            };
        }

        for start in n..self.name.len() {
            if !crosses_slash && self.name[start] == '/' {
                // the remainder may still begin at this separator
                return self.run(p, start);
            }
            match self.run(p, start) {
                Outcome::NoMatch => continue,
                other => return other,
            }
        }
        Outcome::Abort
    }

    /// Match one name character against the class opening at `pattern[p]`.
    ///
    /// Returns the pattern index after the closing `]`, or the outcome to
    /// report. An unterminated class aborts.
    fn class(&self, p: usize, c: char) -> Result<usize, Outcome> {
        let pat = &self.pattern;
        let mut i = p + 1;
        let negated = pat.get(i) == Some(&'^');
        if negated {
            i += 1;
        }

        let mut found = false;
        // `]` or `-` right after the opening bracket is literal
        if let Some(&first) = pat.get(i) {
            if first == ']' || first == '-' {
                found = c == first;
                i += 1;
            }
        }

        while i < pat.len() {
            match pat[i] {
                ']' => {
                    return if found != negated {
                        Ok(i + 1)
                    } else {
                        Err(Outcome::NoMatch)
                    };
                }
                lo if i + 2 < pat.len() && pat[i + 1] == '-' && pat[i + 2] != ']' => {
                    found |= lo <= c && c <= pat[i + 2];
                    i += 3;
                }
                single => {
                    found |= single == c;
                    i += 1;
                }
            }
        }
        Err(Outcome::Abort)
    }
}

fn unescape(c: char) -> char {
    match c {
        'a' => '\x07',
        'b' => '\x08',
        'f' => '\x0c',
        'n' => '\n',
        'r' => '\r',
        't' => '\t',
        'v' => '\x0b',
        other => other,
    }
}
