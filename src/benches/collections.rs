use std::collections::{BTreeMap, HashMap, HashSet};
use std::hint::black_box;

use rand::Rng;
use serde_json::{json, Value};

use crate::harness::BenchConfig;
use crate::orchestrator::{Category, Workload};

use super::scaled;

pub const CATEGORY: &str = "Collections";

const LEN: usize = 10_000;

pub fn category(cfg: &BenchConfig) -> Category {
    let mut rng = cfg.rng();
    let data: Vec<u32> = (0..LEN).map(|_| rng.gen_range(0..1_000_000)).collect();
    let keys: Vec<String> = (0..1_000).map(|i| format!("key{i}")).collect();
    let probes: Vec<u32> = (0..1_000).map(|_| rng.gen_range(0..1_000_000)).collect();

    let mut c = Category::new(CATEGORY);

    c.push(
        Workload::infallible(scaled(cfg, "Vec Creation", 2), || vec![0u32; LEN]).with_units(LEN as u64),
    );

    c.push(
        Workload::infallible(scaled(cfg, "Vec Push", 2), || {
            let mut v = Vec::new();
            for i in 0..LEN as u32 {
                v.push(i);
            }
            v
        })
        .with_units(LEN as u64),
    );

    let src = data.clone();
    c.push(Workload::infallible(scaled(cfg, "Vec Pop", 2), move || {
        let mut v = src.clone();
        let mut sum = 0u64;
        while let Some(x) = v.pop() {
            sum += u64::from(x);
        }
        sum
    }));

    let src = data.clone();
    c.push(Workload::infallible(scaled(cfg, "Vec Map", 5), move || {
        src.iter().map(|x| x * 2).collect::<Vec<_>>()
    }));

    let src = data.clone();
    c.push(Workload::infallible(scaled(cfg, "Vec Filter", 5), move || {
        src.iter().copied().filter(|x| x % 2 == 0).collect::<Vec<_>>()
    }));

    let src = data.clone();
    c.push(Workload::infallible(scaled(cfg, "Vec Reduce", 5), move || {
        src.iter().fold(0u64, |acc, &x| acc + u64::from(x))
    }));

    let src = data.clone();
    c.push(Workload::infallible(cfg.sampler("Vec Index Access"), move || {
        let v: &[u32] = black_box(&src);
        (0..1_000).map(|i| v[(i * 7) % v.len()]).max()
    }));

    let src = data.clone();
    c.push(Workload::infallible(scaled(cfg, "Vec Sort", 5), move || {
        let mut v = src.clone();
        v.sort_unstable();
        v
    }));

    let k = keys.clone();
    c.push(Workload::infallible(scaled(cfg, "HashMap Insert", 2), move || {
        let mut m = HashMap::with_capacity(k.len());
        for (i, key) in k.iter().enumerate() {
            m.insert(key.as_str(), i);
        }
        m.len()
    }));

    let map: HashMap<String, usize> = keys.iter().cloned().enumerate().map(|(i, k)| (k, i)).collect();
    let lookups = keys.clone();
    c.push(Workload::infallible(cfg.sampler("HashMap Lookup"), move || {
        lookups.iter().filter_map(|k| map.get(k)).sum::<usize>()
    }));

    let tree: BTreeMap<u32, u32> = data.iter().map(|&x| (x, x)).collect();
    c.push(Workload::infallible(scaled(cfg, "BTreeMap Iteration", 5), move || {
        tree.values().fold(0u64, |acc, &v| acc + u64::from(v))
    }));

    let set: HashSet<u32> = data.iter().copied().collect();
    c.push(Workload::infallible(cfg.sampler("HashSet Contains"), move || {
        probes.iter().filter(|p| set.contains(*p)).count()
    }));

    let doc = json!({
        "name": "bench",
        "values": data.iter().take(1_000).collect::<Vec<_>>(),
        "keys": keys,
    });
    let payload = doc.clone();
    c.push(Workload::new(scaled(cfg, "JSON Serialize", 5), move || {
        black_box(serde_json::to_string(&payload)?);
        Ok(())
    }));

    let text = doc.to_string();
    c.push(Workload::new(scaled(cfg, "JSON Parse", 5), move || {
        let v: Value = serde_json::from_str(&text)?;
        black_box(v);
        Ok(())
    }));

    c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_inputs() {
        let cfg = BenchConfig::default();
        let mut a = category(&cfg);
        let mut b = category(&cfg);
        assert_eq!(a.workloads.len(), b.workloads.len());
        for (wa, wb) in a.workloads.iter_mut().zip(b.workloads.iter_mut()) {
            assert_eq!(wa.name(), wb.name());
            assert!(wa.call().is_ok());
            assert!(wb.call().is_ok());
        }
    }
}
