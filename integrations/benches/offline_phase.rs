use divan;
use epir_client::DecryptionContext;
use std::{ops::ControlFlow, time::Duration};

fn main() {
    divan::main();
}

const MMAX_ARGS: &[usize] = &[1usize << 16, 1usize << 20];

#[divan::bench(args = MMAX_ARGS, max_time = Duration::from_secs(300), skip_ext_time = true)]
fn mg_table_generate(bencher: divan::Bencher, &mmax: &usize) {
    bencher.bench(|| DecryptionContext::generate(divan::black_box(mmax)));
}

#[divan::bench(args = MMAX_ARGS, max_time = Duration::from_secs(300), skip_ext_time = true)]
fn mg_table_generate_with_progress(bencher: divan::Bencher, &mmax: &usize) {
    bencher.bench(|| {
        DecryptionContext::generate_with_progress(divan::black_box(mmax), |count| {
            divan::black_box(count);
            ControlFlow::Continue(())
        })
    });
}

#[divan::bench(args = MMAX_ARGS, max_time = Duration::from_secs(300), skip_ext_time = true)]
fn mg_table_load(bencher: divan::Bencher, &mmax: &usize) {
    let path = std::env::temp_dir().join(format!("epir-bench-{}", mmax)).join("mG.bin");
    DecryptionContext::generate(mmax).unwrap().save(&path).unwrap();

    bencher.bench(|| DecryptionContext::load(divan::black_box(&path), divan::black_box(mmax)));

    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[divan::bench(args = MMAX_ARGS, max_time = Duration::from_secs(100), skip_ext_time = true)]
fn mg_table_digest(bencher: divan::Bencher, &mmax: &usize) {
    let ctx = DecryptionContext::generate(mmax).unwrap();
    bencher.bench(|| divan::black_box(&ctx).digest());
}
