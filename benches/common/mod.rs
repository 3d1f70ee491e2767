#![allow(dead_code)]
use std::fs;
use std::path::Path;

use mypl::ast::StmtList;
use mypl::pipeline;
use test_support::bench_cases;

/// `(label, program path, stdin)` for every case flagged with `bench: true`.
pub fn workloads() -> Vec<(String, String, String)> {
    let cases = bench_cases(Path::new("tests/programs")).unwrap_or_else(|err| panic!("{err:#}"));
    cases
        .into_iter()
        .map(|case| {
            let stdin = case.stdin().unwrap_or_else(|err| panic!("{err:#}"));
            let path = case.program_path.display().to_string();
            (case.name, path, stdin)
        })
        .collect()
}

pub fn load_source(path: &str) -> String {
    fs::read_to_string(path).unwrap_or_else(|err| panic!("read {path}: {err}"))
}

pub fn load_program(path: &str) -> StmtList {
    let source = load_source(path);
    pipeline::compile(&source).unwrap_or_else(|err| panic!("compile {path}: {err}"))
}
