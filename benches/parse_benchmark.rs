use criterion::{Criterion, black_box, criterion_group, criterion_main};
use rf_harness::report::parse_results_bytes;

fn build_report(tests: usize) -> String {
    let mut xml = String::from("<robot><suite id=\"s1\" name=\"Bench\">");
    for i in 0..tests {
        let status = if i % 10 == 0 { "FAIL" } else { "PASS" };
        xml.push_str(&format!(
            "<test id=\"s1-t{i}\" name=\"Test {i}\"><kw name=\"Step\"><msg>log line {i}</msg><status status=\"PASS\"/></kw><status status=\"{status}\">{}</status></test>",
            "failure detail ".repeat(12)
        ));
    }
    xml.push_str("</suite><statistics><suite><stat pass=\"900\" fail=\"100\">Bench</stat></suite></statistics></robot>");
    xml
}

fn benchmark_parse(c: &mut Criterion) {
    let report = build_report(1000);

    c.bench_function("parse_results_1000_tests", |b| {
        b.iter(|| {
            let summary = parse_results_bytes(black_box(report.as_bytes()));
            assert!(summary.is_ok());
        })
    });
}

criterion_group!(benches, benchmark_parse);
criterion_main!(benches);
