//! Benchmarks for response decoding
//!
//! Covers the hot path of a collection cycle: parsing a full page envelope,
//! flattening inventory records and extracting counter samples.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use ontap_perf::protocol::collect_instances;
use ontap_perf::transport::xml::parse_response;
use ontap_perf::{decode, Element, FieldFilter};

const PAGE: usize = 999;

fn volume_page(volumes: usize) -> Element {
    let mut list = Element::new("attributes-list");
    for i in 0..volumes {
        list.push_child(
            Element::new("volume-attributes")
                .with_child(
                    Element::new("volume-id-attributes")
                        .with_value("name", format!("vol{:04}", i))
                        .with_value("owning-vserver-name", "svm1")
                        .with_value("containing-aggregate-name", "aggr1"),
                )
                .with_child(
                    Element::new("volume-space-attributes")
                        .with_value("size-total", 1_073_741_824u64)
                        .with_value("size-used", 524_288_000u64),
                ),
        );
    }
    Element::new("results").with_value("num-records", volumes).with_child(list)
}

fn counters_page(instances: usize, counters: usize) -> Element {
    let mut list = Element::new("instances");
    for i in 0..instances {
        let mut data = Element::new("counters");
        for c in 0..counters {
            data.push_child(
                Element::new("counter-data")
                    .with_value("name", format!("counter_{}", c))
                    .with_value("value", i * c),
            );
        }
        list.push_child(
            Element::new("instance-data")
                .with_value("name", format!("vol{:04}/plex0", i))
                .with_child(data),
        );
    }
    Element::new("results").with_value("timestamp", 1_700_000_000).with_child(list)
}

fn counters_xml(instances: usize) -> String {
    let mut body = String::from(
        "<?xml version='1.0' encoding='UTF-8'?><netapp version='1.15'><results status='passed'>",
    );
    body.push_str(&format!("<records>{}</records><instances>", instances));
    for i in 0..instances {
        body.push_str(&format!(
            "<instance-data><name>vol{:04}</name><counters>\
             <counter-data><name>read_ops</name><value>{}</value></counter-data>\
             <counter-data><name>write_ops</name><value>{}</value></counter-data>\
             </counters></instance-data>",
            i,
            i * 3,
            i * 7
        ));
    }
    body.push_str("</instances></results></netapp>");
    body
}

fn bench_decode_inventory(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Elements(PAGE as u64));

    let page = volume_page(PAGE);
    let filter = FieldFilter::from(&["name", "size-used"][..]);

    group.bench_function("volume_page_unfiltered", |b| {
        b.iter(|| decode(black_box(&page), None));
    });

    group.bench_function("volume_page_filtered", |b| {
        b.iter(|| decode(black_box(&page), Some(&filter)));
    });

    group.finish();
}

fn bench_collect_samples(c: &mut Criterion) {
    let mut group = c.benchmark_group("samples");
    group.throughput(Throughput::Elements(PAGE as u64));

    let page = counters_page(PAGE, 20);

    group.bench_function("counter_page_999x20", |b| {
        b.iter(|| collect_instances(black_box(&page), "perf-object-get-instances"));
    });

    group.finish();
}

fn bench_parse_envelope(c: &mut Criterion) {
    let mut group = c.benchmark_group("envelope");
    let body = counters_xml(PAGE);
    group.throughput(Throughput::Bytes(body.len() as u64));

    group.bench_function("parse_counter_page", |b| {
        b.iter(|| parse_response(black_box(&body)));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_decode_inventory,
    bench_collect_samples,
    bench_parse_envelope
);
criterion_main!(benches);
