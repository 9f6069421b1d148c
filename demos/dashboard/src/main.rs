//! Boarding-applications page driven through a scripted event loop.
//!
//! The gateway is a stand-in: requests park until the script completes them,
//! which lets the demo show an out-of-order response being ignored.
//!
//! Run with `RUST_LOG=debug cargo run -p dashboard` to see the runtime's logs.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use anyhow::{Context, bail};
use futures::channel::oneshot;
use futures::executor::LocalPool;
use tether_core::prelude::*;
use tether_dom::{ChangeKind, Document, Element, ObserveOptions, mutation_watcher};

#[derive(Clone, Debug)]
struct Application {
    merchant: String,
    status: &'static str,
}

type Reply = oneshot::Sender<Result<Application, String>>;

#[derive(Default)]
struct Gateway {
    inflight: RefCell<Vec<(String, Reply)>>,
}

impl Gateway {
    fn fetch(&self, merchant_id: &str) -> impl Future<Output = Result<Application, String>> + use<> {
        let (tx, rx) = oneshot::channel();
        self.inflight.borrow_mut().push((merchant_id.to_string(), tx));
        async move {
            match rx.await {
                Ok(reply) => reply,
                Err(_) => Err("gateway dropped the request".to_string()),
            }
        }
    }

    fn complete(&self, merchant_id: &str, reply: Result<Application, String>) -> anyhow::Result<()> {
        let mut inflight = self.inflight.borrow_mut();
        let pos = inflight
            .iter()
            .position(|(id, _)| id == merchant_id)
            .with_context(|| format!("no request in flight for {merchant_id}"))?;
        let (_, tx) = inflight.remove(pos);
        if tx.send(reply).is_err() {
            bail!("request for {merchant_id} was abandoned");
        }
        Ok(())
    }
}

struct Page {
    gateway: Rc<Gateway>,
    panel: Element,
    panel_changes: Rc<Cell<usize>>,
}

impl Page {
    fn render(&self, merchant_id: &str, open_modal: Option<&str>) -> String {
        let id = merchant_id.to_string();
        lifecycle_effect(
            || log::info!("applications page mounted"),
            move || log::info!("applications page unmounted (last merchant {id})"),
        );

        let modals = remember_modal_registry();
        if let Some(modal) = open_modal {
            modals.open(modal);
        }
        let gateway = self.gateway.clone();
        let id = merchant_id.to_string();
        let application = async_state(merchant_id.to_string(), move || gateway.fetch(&id));

        let changes = self.panel_changes.clone();
        mutation_watcher(
            Some(&self.panel),
            ObserveOptions::new().child_list().attributes().subtree(),
            move |records| {
                for record in records {
                    if let ChangeKind::Attributes { name, .. } = &record.kind {
                        log::debug!("panel attribute '{name}' changed");
                    }
                }
                changes.set(changes.get() + records.len());
            },
        );

        let body = match application.status() {
            AsyncStatus::Idle => "idle".to_string(),
            AsyncStatus::Pending => "loading…".to_string(),
            AsyncStatus::Resolved => application
                .value
                .map(|a| format!("{} ({})", a.merchant, a.status))
                .unwrap_or_default(),
            AsyncStatus::Rejected => application
                .error
                .map(|e| format!("error: {e}"))
                .unwrap_or_default(),
        };
        match modals.open_id() {
            Some(modal) => format!("{body} [modal: {modal}]"),
            None => body,
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut pool = LocalPool::new();
    let doc = Document::new();
    let panel = doc.create_element("section");
    let page = Page {
        gateway: Rc::new(Gateway::default()),
        panel: panel.clone(),
        panel_changes: Rc::new(Cell::new(0)),
    };
    let surface = Surface::new("applications").with_spawner(pool.spawner());

    let frame_with = |merchant: &str, modal: Option<&str>| -> anyhow::Result<String> {
        let out = surface.compose(|| page.render(merchant, modal))?;
        println!("[{merchant}] {out}");
        Ok(out)
    };
    let frame = |merchant: &str| frame_with(merchant, None);

    frame("m-100")?;
    page.gateway.complete(
        "m-100",
        Ok(Application {
            merchant: "Acme Coffee".into(),
            status: "approved",
        }),
    )?;
    pool.run_until_stalled();
    frame("m-100")?;

    // Two quick switches; the older response arrives last and is ignored.
    frame("m-200")?;
    frame("m-300")?;
    page.gateway.complete(
        "m-300",
        Ok(Application {
            merchant: "Bolt Bikes".into(),
            status: "in review",
        }),
    )?;
    page.gateway.complete(
        "m-200",
        Ok(Application {
            merchant: "Stale Co".into(),
            status: "declined",
        }),
    )?;
    pool.run_until_stalled();
    let shown = frame("m-300")?;
    if shown.contains("Stale Co") {
        bail!("stale response overwrote the current one");
    }

    frame_with("m-300", Some("edit-application")).context("opening modal")?;

    panel.set_attribute("aria-busy", "true");
    panel.append_child(&doc.create_element("table"))?;
    doc.flush();
    println!("panel changes observed: {}", page.panel_changes.get());

    frame("m-404")?;
    page.gateway
        .complete("m-404", Err("merchant not found".into()))?;
    pool.run_until_stalled();
    frame("m-404")?;

    surface.dispose();
    println!("observations after teardown: {}", doc.active_observations());
    Ok(())
}
