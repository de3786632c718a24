use anyhow::{Context, Result, bail};

const MAX_RANGE_SPAN: u64 = 10_000;

/// Resolve CLI seed tokens into concrete seeds, keeping first-seen order.
///
/// Accepts decimal integers (negative values use their magnitude), `0x` hex
/// literals and inclusive ranges such as `10..14`.
pub fn resolve_seed_inputs(tokens: &[String]) -> Result<Vec<u64>> {
    let mut seeds: Vec<u64> = Vec::new();
    let mut push = |seed: u64| {
        if !seeds.contains(&seed) {
            seeds.push(seed);
        }
    };

    for token in tokens {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        if let Some((start, end)) = token.split_once("..") {
            let start = parse_seed(start)?;
            let end = parse_seed(end)?;
            if end < start {
                bail!("seed range {token} runs backwards");
            }
            if end - start >= MAX_RANGE_SPAN {
                bail!("seed range {token} spans more than {MAX_RANGE_SPAN} seeds");
            }
            (start..=end).for_each(&mut push);
            continue;
        }
        push(parse_seed(token)?);
    }

    if seeds.is_empty() {
        bail!("no seeds given");
    }
    Ok(seeds)
}

fn parse_seed(raw: &str) -> Result<u64> {
    let raw = raw.trim();
    if let Some(hex) = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16).with_context(|| format!("invalid hex seed {raw}"));
    }
    if let Ok(value) = raw.parse::<u64>() {
        return Ok(value);
    }
    raw.parse::<i64>()
        .map(i64::unsigned_abs)
        .with_context(|| format!("invalid seed {raw}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn numeric_hex_and_negative_seeds_resolve() {
        let seeds = resolve_seed_inputs(&tokens(&["1337", "0xff", "-5", "18446744073709551615"])).unwrap();
        assert_eq!(seeds, vec![1337, 255, 5, u64::MAX]);
    }

    #[test]
    fn ranges_expand_and_duplicates_collapse() {
        let seeds = resolve_seed_inputs(&tokens(&["3..5", "4", "", "1"])).unwrap();
        assert_eq!(seeds, vec![3, 4, 5, 1]);
    }

    #[test]
    fn bad_input_is_rejected() {
        assert!(resolve_seed_inputs(&tokens(&["banana"])).is_err());
        assert!(resolve_seed_inputs(&tokens(&["9..2"])).is_err());
        assert!(resolve_seed_inputs(&tokens(&["0..100000"])).is_err());
        assert!(resolve_seed_inputs(&[]).is_err());
    }
}
