//! Text template engine for authored strings.
//!
//! Stages run in a fixed order: conditional text `{$cond:yes|no}`, random
//! choice `{A|B|C}`, variable interpolation `{var.NAME:default}`, then escape
//! sequences. Malformed constructs are left in place verbatim.

use once_cell::sync::Lazy;
use rand::Rng;
use regex::{Captures, Regex};

use crate::condition::CompareOp;
use crate::numbers::{f64_to_index, usize_to_f64};
use crate::state::PlayerState;

static CONDITIONAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\$((?:(?:tag|status):|[^:}])+):([^}|]+)\|([^}]+)\}")
        .expect("conditional pattern compiles")
});
static CONDITION_BODY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.+?)\s*(>=|<=|==|!=|>|<)\s*(.+)$").expect("condition pattern compiles")
});
static RANDOM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([^$}][^}]*)\}").expect("random pattern compiles"));
static VARIABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{var\.(\w+)(?::([^}]*))?\}").expect("variable pattern compiles")
});

// Private-use stand-ins so escaped characters survive the structural stages.
const HELD_BACKSLASH: char = '\u{E000}';
const HELD_OPEN: char = '\u{E001}';
const HELD_CLOSE: char = '\u{E002}';

/// Render a template against the state. Never fails and never mutates state.
pub fn render<R: Rng + ?Sized>(template: &str, state: &PlayerState, rng: &mut R) -> String {
    if !template.contains(['{', '\\']) {
        return template.to_string();
    }
    let held = hold_escapes(template);
    let text = render_conditionals(&held, state);
    let text = render_random(&text, rng);
    let text = render_variables(&text, state);
    unescape(&text)
}

/// Resolve `{$left op right:trueText|falseText}` constructs.
#[must_use]
pub fn render_conditionals(text: &str, state: &PlayerState) -> String {
    CONDITIONAL
        .replace_all(text, |caps: &Captures<'_>| {
            let (when_true, when_false) = (caps[2].trim(), caps[3].trim());
            if check_simple_condition(caps[1].trim(), state) {
                when_true.to_string()
            } else {
                when_false.to_string()
            }
        })
        .into_owned()
}

/// Pick one option uniformly from every `{A|B|...}` group.
///
/// Groups with a single option (including `{var.NAME}`) pass through.
pub fn render_random<R: Rng + ?Sized>(text: &str, rng: &mut R) -> String {
    RANDOM
        .replace_all(text, |caps: &Captures<'_>| {
            let options: Vec<&str> = caps[1].split('|').map(str::trim).collect();
            if options.len() <= 1 {
                return caps[0].to_string();
            }
            let roll = rng.r#gen::<f64>() * usize_to_f64(options.len());
            f64_to_index(roll, options.len())
                .and_then(|idx| options.get(idx))
                .map_or_else(|| caps[0].to_string(), |option| (*option).to_string())
        })
        .into_owned()
}

/// Substitute `{var.NAME}` / `{var.NAME:default}`; absent without default is `0`.
#[must_use]
pub fn render_variables(text: &str, state: &PlayerState) -> String {
    VARIABLE
        .replace_all(text, |caps: &Captures<'_>| {
            state.variable(&caps[1]).map_or_else(
                || {
                    caps.get(2)
                        .map_or_else(|| "0".to_string(), |default| default.as_str().to_string())
                },
                ToString::to_string,
            )
        })
        .into_owned()
}

/// Resolve `\n`, `\t`, `\{`, `\}` and `\\`.
#[must_use]
pub fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            HELD_BACKSLASH => out.push('\\'),
            HELD_OPEN => out.push('{'),
            HELD_CLOSE => out.push('}'),
            '\\' => match chars.peek().copied() {
                Some('n') => {
                    chars.next();
                    out.push('\n');
                }
                Some('t') => {
                    chars.next();
                    out.push('\t');
                }
                Some(next @ ('{' | '}' | '\\')) => {
                    chars.next();
                    out.push(next);
                }
                _ => out.push('\\'),
            },
            other => out.push(other),
        }
    }
    out
}

fn hold_escapes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        let held = match chars.peek() {
            Some('\\') => Some(HELD_BACKSLASH),
            Some('{') => Some(HELD_OPEN),
            Some('}') => Some(HELD_CLOSE),
            _ => None,
        };
        match held {
            Some(marker) => {
                chars.next();
                out.push(marker);
            }
            None => out.push(ch),
        }
    }
    out
}

fn check_simple_condition(condition: &str, state: &PlayerState) -> bool {
    let Some(caps) = CONDITION_BODY.captures(condition) else {
        return false;
    };
    let left = left_value(caps[1].trim(), state);
    let right = right_value(caps[3].trim(), state);
    CompareOp::parse(&caps[2])
        .compare(left, right)
        .unwrap_or(false)
}

// Variables shadow stats of the same name; anything non-numeric reads as 0.
fn left_value(name: &str, state: &PlayerState) -> f64 {
    let value = state
        .variable(name)
        .map(crate::state::VariableValue::as_number)
        .or_else(|| state.stat(name))
        .unwrap_or(0.0);
    if value.is_nan() { 0.0 } else { value }
}

fn right_value(raw: &str, state: &PlayerState) -> f64 {
    if let Some(tag) = raw.strip_prefix("tag:") {
        return if state.has_tag(tag) { 1.0 } else { 0.0 };
    }
    if let Some(status) = raw.strip_prefix("status:") {
        return if state.has_status(status) { 1.0 } else { 0.0 };
    }
    raw.parse::<f64>()
        .ok()
        .filter(|value| !value.is_nan())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{StatusEffectInstance, VariableValue};
    use rand::SeedableRng;
    use rand::rngs::mock::StepRng;
    use rand_chacha::ChaCha20Rng;

    fn rng() -> ChaCha20Rng {
        ChaCha20Rng::seed_from_u64(11)
    }

    #[test]
    fn conditional_text_reads_stats() {
        let mut state = PlayerState::default();
        state.stats.health = 80.0;
        let template = "{$health>=50:strong|weak}";
        assert_eq!(render(template, &state, &mut rng()), "strong");
        state.stats.health = 20.0;
        assert_eq!(render(template, &state, &mut rng()), "weak");
    }

    #[test]
    fn conditional_text_prefers_variables_and_reads_tags_and_status() {
        let mut state = PlayerState::default();
        state
            .variables
            .insert("health".into(), VariableValue::Number(1.0));
        state.tags.push("rebel".into());
        state.status_effects.push(StatusEffectInstance {
            effect_id: "flu".into(),
            remaining_duration: 1,
        });
        assert_eq!(render_conditionals("{$health > 50:big|small}", &state), "small");
        assert_eq!(render_conditionals("{$turn < tag:rebel:yes|no}", &state), "yes");
        assert_eq!(render_conditionals("{$turn == status:flu:sick|fine}", &state), "fine");
        assert_eq!(render_conditionals("{$status_level > 1:hi|lo}", &state), "lo");
        assert_eq!(render_conditionals("{$nonsense:a|b}", &state), "b");
    }

    #[test]
    fn random_choice_picks_from_options_and_skips_single_groups() {
        let state = PlayerState::default();
        let mut source = rng();
        for _ in 0..20 {
            let out = render("You feel {calm|uneasy|seen}.", &state, &mut source);
            assert!(
                ["You feel calm.", "You feel uneasy.", "You feel seen."].contains(&out.as_str()),
                "{out}"
            );
        }
        assert_eq!(render_random("{solo}", &mut source), "{solo}");
    }

    #[test]
    fn random_choice_with_max_source_takes_last_option() {
        let mut max = StepRng::new(u64::MAX, 0);
        assert_eq!(render_random("{a|b|c}", &mut max), "c");
    }

    #[test]
    fn variables_fall_back_to_default_then_zero() {
        let mut state = PlayerState::default();
        state.variables.insert("name".into(), VariableValue::from("Ada"));
        assert_eq!(
            render_variables("{var.name} has {var.coins} coins and {var.title:no} title", &state),
            "Ada has 0 coins and no title"
        );
    }

    #[test]
    fn escapes_resolve_last_and_keep_literal_braces() {
        let state = PlayerState::default();
        assert_eq!(
            render(r"line\none \{not|random\} \\ done", &state, &mut rng()),
            "line\none {not|random} \\ done"
        );
        assert_eq!(unescape(r"a\tb"), "a\tb");
    }

    #[test]
    fn plain_text_is_untouched_and_malformed_passes_through() {
        let state = PlayerState::default();
        let plain = "Nothing to see here.";
        assert_eq!(render(plain, &state, &mut rng()), plain);
        let once = render(plain, &state, &mut rng());
        assert_eq!(render(&once, &state, &mut rng()), plain);
        assert_eq!(render("{$broken", &state, &mut rng()), "{$broken");
        assert_eq!(render("unclosed {a|b", &state, &mut rng()), "unclosed {a|b");
    }
}
