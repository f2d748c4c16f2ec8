use std::{collections::HashSet, time::Duration};

use anyhow::Result;
use deferred_hash_api::{
    HashService, ServiceConfig, ServiceError,
    digest::digest,
    lifecycle::Phase,
    store::{StoredValue, Ticket},
};
use tokio::time::{Instant, sleep, timeout};

const DELAY: Duration = Duration::from_secs(5);

fn service() -> HashService {
    HashService::new(ServiceConfig { delay: DELAY })
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writes_receive_gapless_tickets() -> Result<()> {
    let service = service();
    let writers = 200;

    let mut handles = Vec::with_capacity(writers);
    for i in 0..writers {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service.admit_write(&format!("value-{i}")).await
        }));
    }

    let mut tickets = HashSet::new();
    for handle in handles {
        let ticket = handle.await??;
        assert!(tickets.insert(ticket), "ticket {ticket} handed out twice");
    }

    let expected: HashSet<Ticket> = (1..=writers as Ticket).collect();
    assert_eq!(tickets, expected);
    assert_eq!(service.stats_snapshot().total, writers as u64);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn read_returns_placeholder_then_digest() -> Result<()> {
    let service = service();
    let ticket = service.admit_write("test").await?;

    assert_eq!(service.read(ticket).await?, StoredValue::Pending);
    assert_eq!(service.read(ticket).await?.to_string(), "pending");

    sleep(DELAY + Duration::from_millis(1)).await;

    assert_eq!(
        service.read(ticket).await?.to_string(),
        "7iaw3Ur350mqGo7jwQrpkj9hiYB3Lkc_iBml1JQODbJ6wYX4oOHV-E-IvIh_1nsUNzLDBMxfqa2Ob1f1ACio_w=="
    );

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn each_ticket_resolves_to_its_own_value() -> Result<()> {
    let service = service();
    let values = ["alpha", "beta", "gamma"];

    let mut tickets = Vec::new();
    for value in values {
        tickets.push(service.admit_write(value).await?);
    }
    sleep(DELAY * 2).await;

    for (ticket, value) in tickets.into_iter().zip(values) {
        assert_eq!(
            service.read(ticket).await?,
            StoredValue::Finalized(digest(value))
        );
    }

    Ok(())
}

#[tokio::test]
async fn never_issued_tickets_are_not_found() -> Result<()> {
    let service = service();
    let ticket = service.admit_write("test").await?;

    assert_eq!(service.read(0).await, Err(ServiceError::NotFound));
    assert_eq!(service.read(ticket + 1).await, Err(ServiceError::NotFound));
    assert_eq!(service.read(Ticket::MAX).await, Err(ServiceError::NotFound));

    Ok(())
}

#[test]
fn fresh_stats_report_nan_average() {
    let snapshot = service().stats_snapshot();

    assert_eq!(snapshot.total, 0);
    assert!(snapshot.average().is_nan());
}

#[tokio::test]
async fn shutdown_rejects_writes_but_keeps_reads() -> Result<()> {
    let service = service();
    let ticket = service.admit_write("test").await?;

    assert!(service.begin_shutdown());
    assert!(!service.begin_shutdown());
    assert_eq!(service.phase(), Phase::Draining);

    for _ in 0..3 {
        assert_eq!(
            service.admit_write("late").await,
            Err(ServiceError::ServiceUnavailable)
        );
    }
    assert_eq!(service.read(ticket).await?, StoredValue::Pending);
    assert_eq!(service.stats_snapshot().total, 1);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn drain_waits_for_every_admitted_unit() -> Result<()> {
    let service = service();
    let writes = 8;

    let mut tickets = Vec::new();
    for i in 0..writes {
        tickets.push(service.admit_write(&format!("value-{i}")).await?);
    }

    let started = Instant::now();
    service.begin_shutdown();
    assert_eq!(service.in_flight(), writes);

    service.drained().await;

    assert!(started.elapsed() >= DELAY);
    assert_eq!(service.in_flight(), 0);
    for (i, ticket) in tickets.into_iter().enumerate() {
        assert_eq!(
            service.read(ticket).await?,
            StoredValue::Finalized(digest(&format!("value-{i}")))
        );
    }

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn drain_does_not_finish_while_running() {
    let service = service();

    let waited = timeout(DELAY * 4, service.drained()).await;

    assert!(waited.is_err(), "drain must not complete before shutdown");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn writes_racing_shutdown_are_all_finalized_by_drain() -> Result<()> {
    for _ in 0..50 {
        let service = HashService::new(ServiceConfig {
            delay: Duration::from_millis(1),
        });

        let mut writers = Vec::new();
        for i in 0..32 {
            let service = service.clone();
            writers.push(tokio::spawn(async move {
                service.admit_write(&format!("value-{i}")).await
            }));
        }
        let stopper = {
            let service = service.clone();
            tokio::spawn(async move {
                service.begin_shutdown();
                service.drained().await;
            })
        };

        let mut admitted = Vec::new();
        for writer in writers {
            match writer.await? {
                Ok(ticket) => admitted.push(ticket),
                Err(err) => assert_eq!(err, ServiceError::ServiceUnavailable),
            }
        }
        timeout(Duration::from_secs(5), stopper).await??;

        admitted.sort_unstable();
        let expected: Vec<Ticket> = (1..=admitted.len() as Ticket).collect();
        assert_eq!(admitted, expected);
        assert_eq!(service.in_flight(), 0);
        for ticket in admitted {
            assert!(
                !service.read(ticket).await?.is_pending(),
                "ticket {ticket} still pending after drain"
            );
        }
        assert_eq!(
            service.read(expected.len() as Ticket + 1).await,
            Err(ServiceError::NotFound)
        );
    }

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn aborted_writes_never_leave_uncounted_tickets() -> Result<()> {
    let service = service();

    let mut writers = Vec::new();
    for i in 0..200 {
        let service = service.clone();
        writers.push(tokio::spawn(async move {
            service.admit_write(&format!("value-{i}")).await
        }));
    }
    for writer in writers.iter().step_by(2) {
        writer.abort();
    }
    for writer in writers {
        let _ = writer.await;
    }

    let mut reserved: u64 = 0;
    while service.read(reserved + 1).await.is_ok() {
        reserved += 1;
    }
    assert_eq!(service.stats_snapshot().total, reserved);
    assert_eq!(service.in_flight() as u64, reserved);

    Ok(())
}
