use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;

/// Сигнал завершения одного сценария оформления.
///
/// Каждый удалённый вызов сценария гонится с этим сигналом. После завершения
/// ожидающие вызовы возвращают `None`, их результаты отбрасываются.
#[derive(Debug)]
pub struct Lifetime {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

/// Клонируемый handle, которым можно завершить сценарий из другой задачи.
#[derive(Debug, Clone)]
pub struct TeardownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl TeardownHandle {
    pub fn teardown(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_torn_down(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Lifetime {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self { tx: Arc::new(tx), rx }
    }

    pub fn handle(&self) -> TeardownHandle {
        TeardownHandle { tx: Arc::clone(&self.tx) }
    }

    pub fn end(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_ended(&self) -> bool {
        *self.rx.borrow()
    }

    /// Выполняет `fut`, если сценарий не завершится раньше.
    pub async fn guard<F: Future>(&self, fut: F) -> Option<F::Output> {
        if self.is_ended() {
            return None;
        }
        let mut rx = self.rx.clone();
        tokio::select! {
            biased;
            _ = ended(&mut rx) => None,
            output = fut => Some(output),
        }
    }
}

impl Default for Lifetime {
    fn default() -> Self {
        Self::new()
    }
}

async fn ended(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}
