use std::hint::black_box;

use rand::Rng;

use crate::harness::BenchConfig;
use crate::orchestrator::{Category, Workload};

use super::scaled;

pub const CATEGORY: &str = "Basic Types";

const N: u64 = 100_000;

pub fn category(cfg: &BenchConfig) -> Category {
    let mut rng = cfg.rng();
    let operands: Vec<u64> = (0..1024).map(|_| rng.gen_range(1..1_000_000)).collect();
    let floats: Vec<f64> = operands.iter().map(|&v| v as f64 + 0.5).collect();
    let numeric_strings: Vec<String> = operands.iter().map(u64::to_string).collect();
    let long_string = "a".repeat(10_000);
    let bools: Vec<bool> = (0..1024).map(|_| rng.gen_bool(0.5)).collect();
    let maybe: Vec<Option<u64>> = operands
        .iter()
        .map(|&v| if v % 3 == 0 { None } else { Some(v) })
        .collect();

    let mut c = Category::new(CATEGORY);

    c.push(
        Workload::infallible(cfg.sampler("Integer Addition"), || {
            (0..black_box(N)).fold(0u64, |acc, i| acc.wrapping_add(i))
        })
        .with_units(N),
    );

    let ops = operands.clone();
    c.push(
        Workload::infallible(cfg.sampler("Integer Multiplication"), move || {
            ops.iter().cycle().take(N as usize).fold(1u64, |acc, &v| acc.wrapping_mul(v | 1))
        })
        .with_units(N),
    );

    c.push(
        Workload::infallible(cfg.sampler("Float Division"), move || {
            floats.iter().cycle().take(N as usize).fold(1.0e300, |acc, &v| acc / (v / 1.0e6 + 1.0))
        })
        .with_units(N),
    );

    let ops = operands.clone();
    c.push(
        Workload::infallible(cfg.sampler("Integer to String"), move || {
            ops.iter().map(|v| v.to_string().len()).sum::<usize>()
        })
        .with_units(operands.len() as u64),
    );

    let count = numeric_strings.len() as u64;
    c.push(
        Workload::new(cfg.sampler("String to Integer"), move || {
            let mut sum = 0u64;
            for s in &numeric_strings {
                sum = sum.wrapping_add(s.parse::<u64>()?);
            }
            black_box(sum);
            Ok(())
        })
        .with_units(count),
    );

    c.push(Workload::infallible(scaled(cfg, "String Concatenation", 2), || {
        let mut s = String::new();
        for i in 0..1_000 {
            s.push_str("test");
            s.push_str(&i.to_string());
        }
        s
    }));

    let text = long_string.clone();
    c.push(Workload::infallible(cfg.sampler("String Slicing"), move || {
        let mut total = 0usize;
        for start in (0..text.len() - 100).step_by(97) {
            total += black_box(&text[start..start + 100]).len();
        }
        total
    }));

    c.push(Workload::infallible(cfg.sampler("String Length Access"), move || {
        (0..1_000).map(|_| black_box(&long_string).len()).sum::<usize>()
    }));

    let alphabet: Vec<char> = ('a'..='z').collect();
    c.push(Workload::infallible(cfg.sampler("String Index Access"), move || {
        let s: &[char] = black_box(&alphabet);
        (0..10_000).map(|i| s[i % s.len()] as u32).sum::<u32>()
    }));

    let flags = bools.clone();
    c.push(Workload::infallible(cfg.sampler("Boolean AND"), move || {
        flags.windows(2).filter(|w| w[0] && w[1]).count()
    }));

    let flags = bools.clone();
    c.push(Workload::infallible(cfg.sampler("Boolean OR"), move || {
        flags.windows(2).filter(|w| w[0] || w[1]).count()
    }));

    c.push(Workload::infallible(cfg.sampler("Boolean NOT"), move || {
        bools.iter().filter(|b| !**b).count()
    }));

    c.push(Workload::infallible(cfg.sampler("Option None Check"), move || {
        maybe.iter().filter(|v| v.is_none()).count()
    }));

    c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_unique() {
        let c = category(&BenchConfig::default());
        let mut names: Vec<&str> = c.workloads.iter().map(|w| w.name()).collect();
        let total = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), total);
        assert_eq!(c.name, CATEGORY);
    }

    #[test]
    fn string_parse_workload_succeeds() {
        let mut c = category(&BenchConfig::default());
        let w = c
            .workloads
            .iter_mut()
            .find(|w| w.name() == "String to Integer")
            .unwrap();
        assert!(w.call().is_ok());
        assert_eq!(w.units_per_iteration, Some(1024));
    }
}
