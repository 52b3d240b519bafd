//! Properties of the diff pipeline over randomized buffers.

use codesync_diff::{
    apply_edit_script, apply_resolutions, detect_conflicts, generate_edit_script, hash_lines, lcs,
    resolve_conflicts, smart_diff, split_lines, ResolutionStrategy,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// Small alphabet so random buffers share plenty of lines.
const WORDS: &[&str] = &["fn main() {", "}", "", "let x = 1;", "return x;", "// note", "x += 1;"];

fn random_buffer(rng: &mut StdRng, max_len: usize) -> Vec<String> {
    let len = rng.random_range(0..=max_len);
    (0..len)
        .map(|_| WORDS[rng.random_range(0..WORDS.len())].to_string())
        .collect()
}

fn mutate(rng: &mut StdRng, base: &[String]) -> Vec<String> {
    let mut out = base.to_vec();
    for _ in 0..rng.random_range(0..4) {
        match rng.random_range(0..3) {
            0 if !out.is_empty() => {
                let i = rng.random_range(0..out.len());
                out.remove(i);
            }
            1 => {
                let i = rng.random_range(0..=out.len());
                out.insert(i, format!("inserted {}", rng.random_range(0..100)));
            }
            _ if !out.is_empty() => {
                let i = rng.random_range(0..out.len());
                out[i] = format!("changed {}", rng.random_range(0..100));
            }
            _ => {}
        }
    }
    out
}

#[test]
fn test_replay_reconstructs_edited() {
    let mut rng = StdRng::seed_from_u64(0x5eed);

    for _ in 0..500 {
        let a = random_buffer(&mut rng, 12);
        let b = random_buffer(&mut rng, 12);

        let pairs = lcs(&hash_lines(&a), &hash_lines(&b));
        let script = generate_edit_script(&a, &b, &pairs);
        let replayed = apply_edit_script(&a, &script).expect("script should replay");

        assert_eq!(replayed, b, "a = {:?}, script = {:?}", a, script);
    }
}

#[test]
fn test_lcs_is_valid_common_subsequence() {
    let mut rng = StdRng::seed_from_u64(42);

    for _ in 0..300 {
        let a = random_buffer(&mut rng, 15);
        let b = random_buffer(&mut rng, 15);
        let pairs = lcs(&a, &b);

        for p in &pairs {
            assert_eq!(a[p.i], b[p.j]);
        }
        for w in pairs.windows(2) {
            assert!(w[0].i < w[1].i);
            assert!(w[0].j < w[1].j);
        }
    }
}

#[test]
fn test_self_diff_is_empty() {
    let mut rng = StdRng::seed_from_u64(7);

    for _ in 0..100 {
        let a = random_buffer(&mut rng, 20);
        let pairs = lcs(&hash_lines(&a), &hash_lines(&a));
        assert!(generate_edit_script(&a, &a, &pairs).is_empty());
    }
}

#[test]
fn test_conflicts_never_on_inserts() {
    let mut rng = StdRng::seed_from_u64(99);

    for _ in 0..300 {
        let original = random_buffer(&mut rng, 10);
        let edited = mutate(&mut rng, &original);
        let current = mutate(&mut rng, &original);

        let pairs = lcs(&hash_lines(&original), &hash_lines(&edited));
        let script = generate_edit_script(&original, &edited, &pairs);
        let conflicts = detect_conflicts(&original, &current, &script);

        for c in &conflicts {
            assert!(
                script.iter().any(|op| op.line() == c.line && !op.is_insert()),
                "conflict at line {} has no delete or replace behind it",
                c.line
            );
        }

        let inserts_only: Vec<_> = script.iter().filter(|op| op.is_insert()).cloned().collect();
        assert!(detect_conflicts(&original, &current, &inserts_only).is_empty());
    }
}

#[test]
fn test_smart_diff_round_trip_on_text() {
    let original = "fn main() {\n    let x = 1;\n    println!(\"{}\", x);\n}\n";
    let edited = "fn main() {\n    let x = 2;\n    let y = x * 2;\n    println!(\"{}\", y);\n}\n";

    let diff = smart_diff(original, original, edited);
    assert!(diff.conflicts.is_empty());

    let replayed = apply_edit_script(&split_lines(original), &diff.edit_script).unwrap();
    assert_eq!(replayed.join("\n"), edited);
}

#[test]
fn test_documented_three_way_scenario() {
    let original = ["a", "b", "c"];
    let current = ["a", "X", "c"];
    let edited = ["a", "Y", "c"];

    let pairs = lcs(&hash_lines(&original), &hash_lines(&edited));
    let script = generate_edit_script(&original, &edited, &pairs);
    let conflicts = detect_conflicts(&original, &current, &script);

    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].line, 2);
    assert_eq!(conflicts[0].vscode_version, "X");
    assert_eq!(conflicts[0].web_app_version.as_deref(), Some("Y"));

    let resolved = resolve_conflicts(&conflicts, ResolutionStrategy::PreferIssuer);
    assert_eq!(resolved[0].resolved.as_deref(), Some("Y"));

    let patched = apply_resolutions(&script, &resolved);
    let op = patched.iter().find(|op| op.line() == 2).unwrap();
    assert_eq!(op.intended(), Some("Y"));

    // Resolving toward the live side makes the replayed buffer match it.
    let live = resolve_conflicts(&conflicts, ResolutionStrategy::PreferLive);
    let patched = apply_resolutions(&script, &live);
    assert_eq!(apply_edit_script(&original, &patched).unwrap(), current);
}
