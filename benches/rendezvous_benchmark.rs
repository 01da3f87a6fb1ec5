use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use lite_rendezvous::{batch, channel};
use std::time::Duration;
use tokio::sync::oneshot;

/// Benchmark: channel creation (rendezvous pair vs tokio oneshot)
/// 基准测试：通道创建（会合通道 vs tokio oneshot）
fn bench_creation_comparison(c: &mut Criterion) {
    let mut group = c.benchmark_group("creation_comparison");

    group.bench_function("rendezvous", |b| {
        b.iter(|| {
            let (_left, _right) = channel::<u32>();
        });
    });

    group.bench_function("tokio_oneshot", |b| {
        b.iter(|| {
            let (_tx, _rx) = oneshot::channel::<u32>();
        });
    });

    group.finish();
}

/// Benchmark: cross-task ping-pong (one rendezvous vs a fresh oneshot pair per round)
/// 基准测试：跨任务乒乓（一个会合通道 vs 每轮新建一对 oneshot）
fn bench_ping_pong_comparison(c: &mut Criterion) {
    let mut group = c.benchmark_group("ping_pong_comparison");

    for rounds in [10u32, 100, 1000].iter() {
        group.bench_with_input(
            BenchmarkId::new("rendezvous", rounds),
            rounds,
            |b, &rounds| {
                let runtime = tokio::runtime::Runtime::new().unwrap();

                b.to_async(&runtime).iter_custom(|iters| async move {
                    let mut total_duration = Duration::from_secs(0);

                    for _ in 0..iters {
                        let (left, right) = channel::<u32>();

                        let start = std::time::Instant::now();

                        let echo = tokio::spawn(async move {
                            let mut incoming = right.recv().await.unwrap();
                            while let Some(value) = incoming {
                                incoming = match right.send(value + 1).await {
                                    Ok(next) => next,
                                    Err(_) => break,
                                };
                            }
                        });

                        left.wait().await.unwrap();
                        for i in 0..rounds {
                            let _reply = left.send(i).await.unwrap();
                        }
                        drop(left);
                        echo.await.unwrap();

                        total_duration += start.elapsed();
                    }

                    total_duration
                });
            },
        );

        group.bench_with_input(
            BenchmarkId::new("tokio_oneshot", rounds),
            rounds,
            |b, &rounds| {
                let runtime = tokio::runtime::Runtime::new().unwrap();

                b.to_async(&runtime).iter_custom(|iters| async move {
                    let mut total_duration = Duration::from_secs(0);

                    for _ in 0..iters {
                        let start = std::time::Instant::now();

                        for i in 0..rounds {
                            let (tx, rx) = oneshot::channel::<(u32, oneshot::Sender<u32>)>();
                            let echo = tokio::spawn(async move {
                                if let Ok((value, reply)) = rx.await {
                                    let _ = reply.send(value + 1);
                                }
                            });

                            let (reply_tx, reply_rx) = oneshot::channel();
                            tx.send((i, reply_tx)).unwrap();
                            let _reply = reply_rx.await.unwrap();
                            echo.await.unwrap();
                        }

                        total_duration += start.elapsed();
                    }

                    total_duration
                });
            },
        );
    }

    group.finish();
}

/// Benchmark: batched transfer (one exchange per batch vs one exchange per item)
/// 基准测试：批量传输（每批一次交换 vs 每个元素一次交换）
fn bench_batch_comparison(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_comparison");

    for size in [10usize, 100, 1000].iter() {
        group.bench_with_input(BenchmarkId::new("send_many", size), size, |b, &size| {
            let runtime = tokio::runtime::Runtime::new().unwrap();

            b.to_async(&runtime).iter_custom(|iters| async move {
                let mut total_duration = Duration::from_secs(0);

                for _ in 0..iters {
                    let (writer, mut reader) = batch::channel::<usize>();

                    let start = std::time::Instant::now();

                    tokio::spawn(async move {
                        let _ = writer.send_many(0..size).await;
                    });
                    let items = reader.drain(Some(size)).await.unwrap();
                    assert_eq!(items.len(), size);

                    total_duration += start.elapsed();
                }

                total_duration
            });
        });

        group.bench_with_input(BenchmarkId::new("send_one", size), size, |b, &size| {
            let runtime = tokio::runtime::Runtime::new().unwrap();

            b.to_async(&runtime).iter_custom(|iters| async move {
                let mut total_duration = Duration::from_secs(0);

                for _ in 0..iters {
                    let (writer, mut reader) = batch::channel::<usize>();

                    let start = std::time::Instant::now();

                    tokio::spawn(async move {
                        for i in 0..size {
                            if writer.send_one(i).await.is_err() {
                                break;
                            }
                        }
                    });
                    let items = reader.drain(Some(size)).await.unwrap();
                    assert_eq!(items.len(), size);

                    total_duration += start.elapsed();
                }

                total_duration
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_creation_comparison,
    bench_ping_pong_comparison,
    bench_batch_comparison,
);

criterion_main!(benches);
