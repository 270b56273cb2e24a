use std::time::Duration;

use checklist_core::filter::FilterKind;
use checklist_core::render::Renderer;
use checklist_core::seeder::{RemoteSeeder, SeederConfig, fallback_tasks};
use checklist_core::shell::{HELP, Shell, run_session};
use checklist_core::store::TaskStore;
use tokio::net::TcpListener;

/// Seeder pointed at a local port nobody listens on, so every fetch falls back.
async fn unreachable_seeder() -> RemoteSeeder {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    RemoteSeeder::new(SeederConfig {
        endpoint: format!("http://{addr}/todos"),
        limit: 5,
        timeout: Duration::from_secs(2),
    })
    .expect("seeder")
}

async fn run_script(script: &str, seed_on_start: bool) -> (Shell, String) {
    let shell = Shell::new(TaskStore::new(), FilterKind::All);
    let mut out = Vec::new();
    let shell = run_session(
        shell,
        unreachable_seeder().await,
        &Renderer::plain(),
        script.as_bytes(),
        &mut out,
        seed_on_start,
    )
    .await
    .expect("session");
    (shell, String::from_utf8(out).expect("utf8"))
}

#[tokio::test]
async fn startup_seed_is_installed_before_session_ends() {
    let (shell, out) = run_script("filter pending\n", true).await;

    assert!(out.contains("Loading todos..."));
    assert!(!shell.is_loading());
    assert_eq!(shell.filter(), FilterKind::Pending);
    assert_eq!(shell.store().tasks(), fallback_tasks().as_slice());
}

#[tokio::test]
async fn without_seeding_the_list_starts_empty_and_quit_stops_reading() {
    let script = "add Buy milk\nfilter completed\nbogus\nhelp\nquit\nadd never\n";
    let (shell, out) = run_script(script, false).await;

    assert!(!out.contains("Loading todos..."));
    assert!(out.contains("No tasks yet. Add one above!"));
    assert!(out.contains("unknown command: bogus"));
    assert!(out.contains(HELP));

    assert_eq!(shell.filter(), FilterKind::Completed);
    assert_eq!(shell.store().len(), 1);
    assert_eq!(shell.store().tasks()[0].text, "Buy milk");
}

#[tokio::test]
async fn reload_requested_just_before_end_of_input_still_lands() {
    let (shell, _) = run_script("add local\nreload\n", false).await;

    assert!(!shell.is_loading());
    assert_eq!(shell.store().tasks(), fallback_tasks().as_slice());
}
