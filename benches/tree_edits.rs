use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use uuid::Uuid;

use family_graph::algorithms::{recalculate_generations, repair_backlinks, would_create_cycle};
use family_graph::config::BacklinkRepair;
use family_graph::models::{Person, PersonDraft, PersonId};
use family_graph::operations::edit_person;

fn lcg_next(state: &mut u64) -> u64 {
    *state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
    *state
}

/// A forest where every member after the first few roots picks an earlier member as parent.
fn synthetic_forest(member_count: usize, root_count: usize) -> Vec<Person> {
    let ids = (0..member_count)
        .map(|idx| PersonId::Uuid(Uuid::from_u128((idx as u128) + 1)))
        .collect::<Vec<_>>();

    let mut state = 0x1234_5678_9abc_def0u64;
    let mut members = ids
        .iter()
        .enumerate()
        .map(|(idx, id)| {
            let mut person = Person::from_draft(*id, &PersonDraft::new(format!("P{idx}")));
            person.parent_id = if idx < root_count {
                None
            } else {
                Some(ids[(lcg_next(&mut state) as usize) % idx])
            };
            person
        })
        .collect::<Vec<_>>();

    members = repair_backlinks(&members, BacklinkRepair::Authoritative).members;
    recalculate_generations(&members)
}

fn bench_generation_recompute(c: &mut Criterion) {
    let mut group = c.benchmark_group("generation_recompute");
    for members in [100usize, 300usize] {
        let forest = synthetic_forest(members, 3);
        group.throughput(Throughput::Elements(members as u64));
        group.bench_with_input(
            BenchmarkId::new("recalculate", format!("{members}m")),
            &forest,
            |b, forest| b.iter(|| black_box(recalculate_generations(forest))),
        );
    }
    group.finish();
}

fn bench_cycle_checks(c: &mut Criterion) {
    let mut group = c.benchmark_group("cycle_checks");
    for members in [100usize, 300usize] {
        let forest = synthetic_forest(members, 3);
        let ids = forest.iter().map(|p| p.id).collect::<Vec<_>>();

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(
            BenchmarkId::new("would_create_cycle", format!("{members}m")),
            &(forest, ids),
            |b, (forest, ids)| {
                let mut seed = 42u64;
                b.iter(|| {
                    let subject = ids[(lcg_next(&mut seed) as usize) % ids.len()];
                    let parent = ids[(lcg_next(&mut seed) as usize) % ids.len()];
                    black_box(would_create_cycle(forest, subject, parent));
                });
            },
        );
    }
    group.finish();
}

fn bench_reparent(c: &mut Criterion) {
    let mut group = c.benchmark_group("reparent");
    let forest = synthetic_forest(300, 3);
    let leaf = forest[forest.len() - 1].clone();
    let target = forest[1].id;
    let mut draft = PersonDraft::from_person(&leaf);
    draft.parent_id = Some(target);

    group.bench_function("edit_person_300m", |b| {
        b.iter(|| {
            black_box(edit_person(
                &forest,
                leaf.id,
                &draft,
                BacklinkRepair::Authoritative,
            ))
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_generation_recompute,
    bench_cycle_checks,
    bench_reparent
);
criterion_main!(benches);
