//! Inline math handling for table cells.
//!
//! Model output wraps every formula in `$...$`. [`split_math`] cuts a cell
//! into plain and math fragments; a [`Typesetter`] turns each math fragment
//! into something displayable.

/// One piece of a cell's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    Text(String),
    /// LaTeX source without the surrounding `$` delimiters.
    Math(String),
}

/// Split text into plain and `$...$` fragments.
///
/// Delimiters pair up left to right and never span a line break. A `$`
/// without a closing partner on the same line stays plain text.
pub fn split_math(text: &str) -> Vec<Fragment> {
    let mut fragments = Vec::new();
    let mut plain = String::new();
    let mut rest = text;

    while let Some(start) = rest.find('$') {
        let after = &rest[start + 1..];
        match after.find(['$', '\n']) {
            Some(end) if after[end..].starts_with('$') => {
                plain.push_str(&rest[..start]);
                if !plain.is_empty() {
                    fragments.push(Fragment::Text(std::mem::take(&mut plain)));
                }
                fragments.push(Fragment::Math(after[..end].to_string()));
                rest = &after[end + 1..];
            }
            _ => {
                plain.push_str(&rest[..=start]);
                rest = after;
            }
        }
    }

    plain.push_str(rest);
    if !plain.is_empty() {
        fragments.push(Fragment::Text(plain));
    }
    fragments
}

/// Renders one LaTeX fragment.
pub trait Typesetter {
    fn typeset(&self, latex: &str) -> String;
}

/// Leaves LaTeX source as it is.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceTypesetter;

impl Typesetter for SourceTypesetter {
    fn typeset(&self, latex: &str) -> String {
        latex.to_string()
    }
}

/// Best-effort conversion of common school-math LaTeX to Unicode for
/// terminals.
///
/// Handles symbol commands, `\widehat{X}`/`\hat{X}`, `\overline{X}`,
/// `\frac{a}{b}` and `\sqrt{x}`. Unknown commands are kept verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnicodeTypesetter;

const SYMBOLS: &[(&str, &str)] = &[
    ("Rightarrow", "⇒"),
    ("Leftarrow", "⇐"),
    ("Leftrightarrow", "⇔"),
    ("rightarrow", "→"),
    ("leftarrow", "←"),
    ("to", "→"),
    ("cdot", "·"),
    ("times", "×"),
    ("div", "÷"),
    ("pm", "±"),
    ("le", "≤"),
    ("leq", "≤"),
    ("ge", "≥"),
    ("geq", "≥"),
    ("ne", "≠"),
    ("neq", "≠"),
    ("approx", "≈"),
    ("infty", "∞"),
    ("in", "∈"),
    ("notin", "∉"),
    ("subset", "⊂"),
    ("cup", "∪"),
    ("cap", "∩"),
    ("emptyset", "∅"),
    ("varnothing", "∅"),
    ("forall", "∀"),
    ("exists", "∃"),
    ("perp", "⊥"),
    ("parallel", "∥"),
    ("angle", "∠"),
    ("triangle", "△"),
    ("circ", "°"),
    ("degree", "°"),
    ("alpha", "α"),
    ("beta", "β"),
    ("gamma", "γ"),
    ("delta", "δ"),
    ("Delta", "Δ"),
    ("pi", "π"),
    ("sigma", "σ"),
    ("Sigma", "Σ"),
    ("omega", "ω"),
    ("Omega", "Ω"),
    ("mathbb{R}", "ℝ"),
    ("mathbb{N}", "ℕ"),
    ("mathbb{Z}", "ℤ"),
    ("mathbb{Q}", "ℚ"),
];

impl Typesetter for UnicodeTypesetter {
    fn typeset(&self, latex: &str) -> String {
        let mut out = String::with_capacity(latex.len());
        let mut rest = latex;

        while let Some(pos) = rest.find('\\') {
            out.push_str(&rest[..pos]);
            rest = &rest[pos + 1..];

            let name_len = rest
                .find(|c: char| !c.is_ascii_alphabetic())
                .unwrap_or(rest.len());
            let name = &rest[..name_len];
            let tail = &rest[name_len..];

            // `\mathbb{R}` style entries include their braces.
            if let Some((key, symbol)) = SYMBOLS
                .iter()
                .find(|(key, _)| key.contains('{') && rest.starts_with(key))
            {
                out.push_str(symbol);
                rest = &rest[key.len()..];
                continue;
            }

            match name {
                "widehat" | "hat" | "overline" => {
                    let mark = if name == "overline" { '\u{305}' } else { '\u{302}' };
                    match take_group(tail) {
                        Some((arg, after)) => {
                            for c in self.typeset(arg).chars() {
                                out.push(c);
                                out.push(mark);
                            }
                            rest = after;
                        }
                        None => {
                            out.push('\\');
                            out.push_str(name);
                            rest = tail;
                        }
                    }
                }
                "frac" | "dfrac" => match take_group(tail).and_then(|(num, after)| {
                    take_group(after).map(|(den, after)| (num, den, after))
                }) {
                    Some((num, den, after)) => {
                        out.push_str(&wrap_operand(&self.typeset(num)));
                        out.push('/');
                        out.push_str(&wrap_operand(&self.typeset(den)));
                        rest = after;
                    }
                    None => {
                        out.push('\\');
                        out.push_str(name);
                        rest = tail;
                    }
                },
                "sqrt" => match take_group(tail) {
                    Some((arg, after)) => {
                        out.push('√');
                        out.push_str(&wrap_operand(&self.typeset(arg)));
                        rest = after;
                    }
                    None => {
                        out.push('√');
                        rest = tail;
                    }
                },
                _ => {
                    match SYMBOLS.iter().find(|(key, _)| *key == name) {
                        Some((_, symbol)) => out.push_str(symbol),
                        None => {
                            out.push('\\');
                            out.push_str(name);
                        }
                    }
                    rest = tail;
                }
            }
        }

        out.push_str(rest);
        out
    }
}

/// Split `{group}rest` into `(group, rest)`, honouring nested braces.
fn take_group(s: &str) -> Option<(&str, &str)> {
    let s = s.trim_start();
    if !s.starts_with('{') {
        return None;
    }
    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some((&s[1..i], &s[i + 1..]));
                }
            }
            _ => {}
        }
    }
    None
}

/// Parenthesise multi-character operands of `/` and `√`.
fn wrap_operand(s: &str) -> String {
    if s.chars().count() <= 1 || s.chars().all(|c| c.is_ascii_digit()) {
        s.to_string()
    } else {
        format!("({s})")
    }
}

/// Split `text` and typeset every math fragment.
pub fn render_fragments(text: &str, typesetter: &dyn Typesetter) -> String {
    split_math(text)
        .into_iter()
        .map(|fragment| match fragment {
            Fragment::Text(t) => t,
            Fragment::Math(m) => typesetter.typeset(&m),
        })
        .collect()
}
