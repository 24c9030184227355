//! Temporal text.

use crate::error::Result;
use crate::temporal::lift::{LiftOp, lift_base, lift1, lift2};
use crate::temporal::{TText, Temporal};

fn initcap(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut word_start = true;
    for c in s.chars() {
        if c.is_alphanumeric() {
            if word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            word_start = false;
        } else {
            out.push(c);
            word_start = true;
        }
    }
    out
}

impl Temporal<String> {
    pub fn upper(&self) -> Result<TText> {
        lift1(self, &|s: &String| -> Result<String> { Ok(s.to_uppercase()) }, false, None)
    }

    pub fn lower(&self) -> Result<TText> {
        lift1(self, &|s: &String| -> Result<String> { Ok(s.to_lowercase()) }, false, None)
    }

    /// First letter of every word upper case, the rest lower case.
    pub fn initcap(&self) -> Result<TText> {
        lift1(self, &|s: &String| -> Result<String> { Ok(initcap(s)) }, false, None)
    }

    /// Concatenation with a text appended.
    pub fn textcat(&self, value: &str) -> Result<TText> {
        let value = value.to_string();
        lift_base(self, &value, &LiftOp::new(&|a: &String, b: &String| -> Result<String> { Ok(format!("{}{}", a, b)) }))
    }

    /// Concatenation with a text prepended.
    pub fn text_textcat(&self, value: &str) -> Result<TText> {
        let value = value.to_string();
        lift_base(self, &value, &LiftOp::new(&|a: &String, b: &String| -> Result<String> { Ok(format!("{}{}", b, a)) }))
    }

    pub fn textcat_temporal(&self, other: &TText) -> Result<Option<TText>> {
        lift2(self, other, &LiftOp::new(&|a: &String, b: &String| -> Result<String> { Ok(format!("{}{}", a, b)) }))
    }
}
