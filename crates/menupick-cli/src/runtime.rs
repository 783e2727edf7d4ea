// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use menupick_app::{MutationRequest, Record, RecordStore, RemoteOp, RemoteOutcome, StoreResult};
use menupick_db::Store;
use menupick_remote::Client;
use menupick_tui::InternalEvent;
use std::sync::mpsc::Sender;
use std::thread;
use tracing::debug;

/// Where the menu lives for this session.
pub enum StoreRuntime {
    Sqlite(Store),
    Remote(Client),
}

impl StoreRuntime {
    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::Sqlite(_) => "sqlite",
            Self::Remote(_) => "remote",
        }
    }

    fn store_mut(&mut self) -> &mut dyn RecordStore {
        match self {
            Self::Sqlite(store) => store,
            Self::Remote(client) => client,
        }
    }
}

impl menupick_tui::AppRuntime for StoreRuntime {
    fn load_records(&mut self) -> StoreResult<Vec<Record>> {
        self.store_mut().list()
    }

    fn execute(&mut self, op: &RemoteOp) -> RemoteOutcome {
        op.execute(self.store_mut())
    }

    fn spawn_mutation(
        &mut self,
        request: MutationRequest,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let client = match self {
            Self::Remote(client) => client.clone(),
            Self::Sqlite(store) => {
                let outcome = request.op.execute(store);
                return tx
                    .send(InternalEvent::MutationFinished {
                        ticket: request.ticket,
                        outcome,
                    })
                    .map_err(|_| anyhow!("mutation event channel closed"));
            }
        };

        let ticket = request.ticket;
        thread::Builder::new()
            .name(format!("menupick-{}", request.op.kind()))
            .spawn(move || {
                let mut client = client;
                let outcome = request.op.execute(&mut client);
                debug!(ticket = ?ticket, ok = outcome.is_ok(), "remote mutation finished");
                // The loop may have exited; a dropped receiver is fine here.
                let _ = tx.send(InternalEvent::MutationFinished { ticket, outcome });
            })
            .context("spawn remote mutation worker")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::StoreRuntime;
    use anyhow::{Result, anyhow};
    use menupick_app::{
        DEFAULT_AUTO_DISMISS, DEFAULT_PAGE_SIZE, MutationPipeline, NotificationScheduler,
        PageView, Record, RecordId, RemoteOp, RemoteReply,
    };
    use menupick_db::Store;
    use menupick_remote::Client;
    use menupick_tui::{AppRuntime, InternalEvent};
    use std::io::Read;
    use std::sync::mpsc;
    use std::thread;
    use std::time::{Duration, Instant};
    use tiny_http::{Response, Server};

    fn sqlite_runtime(names: &[&str]) -> Result<StoreRuntime> {
        let store = Store::open_memory()?;
        store.bootstrap()?;
        store.seed_names(names)?;
        Ok(StoreRuntime::Sqlite(store))
    }

    #[test]
    fn sqlite_runtime_loads_and_executes() -> Result<()> {
        let mut runtime = sqlite_runtime(&["Soup", "Rice"])?;
        assert_eq!(runtime.backend_name(), "sqlite");
        assert_eq!(
            runtime.load_records()?,
            vec![Record::new(1, "Soup"), Record::new(2, "Rice")]
        );

        let outcome = runtime.execute(&RemoteOp::Update {
            id: RecordId::new(2),
            name: "Fried rice".to_owned(),
        });
        assert_eq!(
            outcome,
            Ok(RemoteReply::Updated(Record::new(2, "Fried rice")))
        );
        Ok(())
    }

    #[test]
    fn sqlite_runtime_reports_synchronously() -> Result<()> {
        let mut runtime = sqlite_runtime(&["Soup"])?;
        let now = Instant::now();
        let mut pipeline = MutationPipeline::new(
            PageView::new(DEFAULT_PAGE_SIZE),
            NotificationScheduler::new(DEFAULT_AUTO_DISMISS),
        );
        pipeline
            .apply_listing(runtime.load_records(), now)
            .map_err(|class| anyhow!("load failed: {class:?}"))?;
        pipeline.set_add_input("Noodles");
        let request = pipeline.begin_add(now)?;

        let (tx, rx) = mpsc::channel();
        runtime.spawn_mutation(request, tx)?;
        let InternalEvent::MutationFinished { ticket, outcome } = rx.try_recv()?;
        pipeline
            .complete(ticket, outcome, now)
            .ok_or_else(|| anyhow!("ticket should be pending"))?;

        let names = pipeline
            .list()
            .records()
            .iter()
            .map(|record| record.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["Soup", "Noodles"]);
        Ok(())
    }

    #[test]
    fn remote_runtime_reports_from_worker_thread() -> Result<()> {
        let server =
            Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
        let base_url = format!("http://{}", server.server_addr());
        let handle = thread::spawn(move || {
            let mut request = server.recv().expect("request expected");
            let method = request.method().to_string();
            let mut body = String::new();
            request
                .as_reader()
                .read_to_string(&mut body)
                .expect("request body should be readable");
            request
                .respond(Response::from_string(r#"{"message":"Food deleted successfully"}"#))
                .expect("response should succeed");
            (method, body)
        });

        let client = Client::new(&base_url, None, Duration::from_secs(1))?;
        let mut runtime = StoreRuntime::Remote(client);
        assert_eq!(runtime.backend_name(), "remote");

        let (tx, rx) = mpsc::channel();
        let mut pipeline = MutationPipeline::new(
            PageView::new(DEFAULT_PAGE_SIZE),
            NotificationScheduler::new(DEFAULT_AUTO_DISMISS),
        );
        let now = Instant::now();
        pipeline
            .apply_listing(Ok(vec![Record::new(4, "Soup")]), now)
            .map_err(|class| anyhow!("load failed: {class:?}"))?;
        pipeline.request_delete(0)?;
        let request = pipeline.confirm_delete(now)?;
        runtime.spawn_mutation(request, tx)?;

        let InternalEvent::MutationFinished { ticket, outcome } =
            rx.recv_timeout(Duration::from_secs(5))?;
        assert_eq!(outcome, Ok(RemoteReply::Deleted(RecordId::new(4))));
        pipeline
            .complete(ticket, outcome, now)
            .ok_or_else(|| anyhow!("ticket should be pending"))?;
        assert!(pipeline.list().records().is_empty());

        let (method, body) = handle.join().expect("server thread should join");
        assert_eq!(method, "DELETE");
        assert_eq!(body, r#"{"id":4}"#);
        Ok(())
    }
}
