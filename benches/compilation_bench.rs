//! Compilation performance benchmarks.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use kryc::compile_file;
use std::fs;
use tempfile::TempDir;

fn bench_simple_compilation(c: &mut Criterion) {
    let temp_dir = TempDir::new().unwrap();
    let input_path = temp_dir.path().join("simple.kry");
    let output_path = temp_dir.path().join("simple.krb");

    let content = r#"
App {
    window_title: "Benchmark Test"
    Text { text: "Hello World" }
}
"#;
    fs::write(&input_path, content).unwrap();

    c.bench_function("simple_compilation", |b| {
        b.iter(|| {
            compile_file(black_box(input_path.to_str().unwrap()), black_box(output_path.to_str().unwrap())).unwrap()
        })
    });
}

fn bench_component_heavy_compilation(c: &mut Criterion) {
    let temp_dir = TempDir::new().unwrap();
    let input_path = temp_dir.path().join("components.kry");
    let output_path = temp_dir.path().join("components.krb");

    let mut content = String::from(
        "Define Card {\n  Properties { title: String = \"untitled\" }\n  Container { Text { text: $title } }\n}\n",
    );
    content.push_str("App {\n  Container { layout: \"column\"\n");
    for i in 0..50 {
        content.push_str(&format!("    Card {{ title: \"Item {}\" }}\n", i));
    }
    content.push_str("  }\n}\n");
    fs::write(&input_path, content).unwrap();

    c.bench_function("component_heavy_compilation", |b| {
        b.iter(|| {
            compile_file(black_box(input_path.to_str().unwrap()), black_box(output_path.to_str().unwrap())).unwrap()
        })
    });
}

fn bench_large_file_compilation(c: &mut Criterion) {
    let temp_dir = TempDir::new().unwrap();
    let input_path = temp_dir.path().join("large.kry");
    let output_path = temp_dir.path().join("large.krb");

    let mut content = String::from("App { window_title: \"Large Test\"\n  Container { layout: \"column\"\n");
    for i in 0..500 {
        content.push_str(&format!("    Text {{ text: \"Item {}\" }}\n", i));
    }
    content.push_str("  }\n}\n");
    fs::write(&input_path, content).unwrap();

    c.bench_function("large_file_compilation", |b| {
        b.iter(|| {
            compile_file(black_box(input_path.to_str().unwrap()), black_box(output_path.to_str().unwrap())).unwrap()
        })
    });
}

criterion_group!(
    benches,
    bench_simple_compilation,
    bench_component_heavy_compilation,
    bench_large_file_compilation,
);
criterion_main!(benches);
