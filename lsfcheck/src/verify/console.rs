use super::{Node, ensure_contains, run};
use crate::executor::CommandExecutor;
use crate::markers::{self, cmd};
use crate::{Error, Result, parser};

/// Application Center: services started, GUI port listening, packages installed.
pub async fn check_app_center<E: CommandExecutor>(session: &E) -> Result<()> {
    let services = run(session, Node::Session, cmd::PMC_LIST).await?;
    if let Some(missing) = parser::first_missing(&services, &markers::APPCENTER_SERVICES) {
        return Err(Error::mismatch(
            "Application Center services",
            missing,
            services.trim(),
        ));
    }

    let port = format!("netstat -tuln | grep {}", markers::APPCENTER_PORT);
    let listening = run(session, Node::Session, &port).await?;
    ensure_contains(
        format!("port {}", markers::APPCENTER_PORT),
        &listening,
        markers::LISTEN,
    )?;

    let package = run(session, Node::Session, cmd::APPCENTER_RPM).await?;
    ensure_contains("Application Center package", &package, markers::APPCENTER_PACKAGE)?;

    let mariadb = run(session, Node::Session, cmd::MARIADB_RPM).await?;
    if let Some(missing) = parser::first_missing(&mariadb, &markers::MARIADB_PACKAGES) {
        return Err(Error::not_found(format!("package {missing}"), mariadb));
    }

    tracing::info!("Application Center is installed and running");
    Ok(())
}

pub async fn check_novnc<E: CommandExecutor>(session: &E) -> Result<()> {
    for (command, expected) in markers::NOVNC_CHECKS {
        let output = run(session, Node::Session, command).await?;
        ensure_contains(format!("'{command}'"), &output, expected)?;
    }
    tracing::info!("noVNC is installed and listening");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{Reply, ScriptedExecutor};

    fn app_center() -> ScriptedExecutor {
        ScriptedExecutor::new()
            .on(
                "pmcadmin list",
                Reply::ok("SERVICE        STATUS\nWEBGUI         STARTED\nPNC            STARTED\n"),
            )
            .on(
                "netstat -tuln | grep 8443",
                Reply::ok("tcp6       0      0 :::8443                 :::*                    LISTEN"),
            )
            .on("grep lsf-appcenter", Reply::ok("lsf-appcenter-10.2.0.14-1.noarch"))
            .on(
                "grep MariaDB",
                Reply::ok("MariaDB-client-10.6\nMariaDB-common-10.6\nMariaDB-shared-10.6\nMariaDB-server-10.6\n"),
            )
    }

    #[tokio::test]
    async fn test_app_center() {
        check_app_center(&app_center()).await.unwrap();
    }

    #[tokio::test]
    async fn test_app_center_service_down() {
        let exec = app_center().on(
            "pmcadmin list",
            Reply::ok("WEBGUI         STARTED\nPNC            STOPPED\n"),
        );
        let err = check_app_center(&exec).await.unwrap_err();
        assert!(err.to_string().contains("expected PNC            STARTED"));
    }

    #[tokio::test]
    async fn test_missing_mariadb_package() {
        let exec = app_center().on("grep MariaDB", Reply::ok("MariaDB-client-10.6\n"));
        let err = check_app_center(&exec).await.unwrap_err();
        assert!(err.to_string().starts_with("package MariaDB-common not found"));
    }

    #[tokio::test]
    async fn test_novnc() {
        let exec = ScriptedExecutor::new()
            .on("grep xterm", Reply::ok("xterm-366-8.el8"))
            .on("grep tigervnc", Reply::ok("tigervnc-server-1.12"))
            .on("grep -i novnc", Reply::ok("java -Ddefault.novnc.port=6080 -jar"))
            .on("grep 6080", Reply::ok("tcp 0 0 0.0.0.0:6080 0.0.0.0:* LISTEN"));
        check_novnc(&exec).await.unwrap();

        let exec = exec.on("grep 6080", Reply::ok("tcp 0 0 127.0.0.1:6080 0.0.0.0:* LISTEN"));
        let err = check_novnc(&exec).await.unwrap_err();
        assert!(err.to_string().contains("0.0.0.0:6080"));
    }
}
