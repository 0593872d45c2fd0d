use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use chrono::{Duration, TimeZone, Utc};
use sahara_compliance::{
    CertificateRecord, DEFAULT_SCREENING_CODES, TalentCertificate, calculate_compliance_score, compute_coverage,
    screen_application,
};

const CODES: [&str; 8] = ["H2S", "BOSIET", "FIRST_AID", "GWO", "CSCS", "HUET", "RMTC-OK", "IOSH"];

fn certificates(count: usize) -> Vec<TalentCertificate> {
    let now = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
    (0..count)
        .map(|i| {
            let issuer = if i % 3 == 0 { "RMTC" } else { "OPITO" };
            let cert = TalentCertificate::new(CODES[i % CODES.len()], issuer, now - Duration::days(i as i64 * 17));
            if i % 4 == 0 {
                cert
            } else {
                cert.expiring(now + Duration::days(i as i64 * 11 - 200))
            }
        })
        .collect()
}

fn bench_compute_coverage(c: &mut Criterion) {
    let now = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
    let mut group = c.benchmark_group("compute_coverage");

    for count in [8usize, 64, 512] {
        let certs = certificates(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &certs, |b, certs| {
            b.iter(|| {
                let coverage = compute_coverage(black_box(certs), black_box(&CODES), now);
                black_box(calculate_compliance_score(&coverage))
            });
        });
    }

    group.finish();
}

fn bench_screen_application(c: &mut Criterion) {
    let now = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
    let records: Vec<CertificateRecord> = certificates(32)
        .into_iter()
        .map(|cert| CertificateRecord {
            course_code: cert.course_code,
            issued_at: cert.issued_at.to_rfc3339(),
            expires_at: cert.expires_at.map(|e| e.format("%Y-%m-%d").to_string()),
            issuer: cert.issuer,
        })
        .collect();

    c.bench_function("screen_application_32_records", |b| {
        b.iter(|| screen_application(50, black_box(&records), &DEFAULT_SCREENING_CODES, now));
    });
}

criterion_group!(benches, bench_compute_coverage, bench_screen_application);
criterion_main!(benches);
