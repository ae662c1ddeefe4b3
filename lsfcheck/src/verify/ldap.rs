use super::{Node, ensure_contains, run};
use crate::executor::CommandExecutor;
use crate::markers::{self, cmd};
use crate::{Error, Result, parser};

/// `example.com` becomes `dc=example,dc=com`.
pub fn ldap_base_dn(domain: &str) -> Result<String> {
    let (first, second) = parser::ldap_domain_components(domain)?;
    Ok(format!("dc={first},dc={second}"))
}

fn admin_search(base: &str, admin_password: &str) -> String {
    format!(
        "ldapsearch -x -D \"cn=admin,{base}\" -w {admin_password} -b \"ou=people,{base}\" -s sub \"(objectClass=*)\""
    )
}

/// A node configured as LDAP client can see `user` on the server.
pub async fn check_ldap_client<E: CommandExecutor>(
    session: &E,
    server_ip: &str,
    domain: &str,
    user: &str,
) -> Result<()> {
    let base = ldap_base_dn(domain)?;
    let output = run(
        session,
        Node::Session,
        &format!("ldapsearch -x -H ldap://{server_ip} -b {base}"),
    )
    .await?;
    ensure_contains("LDAP client search base", &output, &base)?;
    ensure_contains(
        format!("LDAP client search for {user}"),
        &output,
        &format!("uid: {user}"),
    )?;
    tracing::info!(server_ip, user, "LDAP client configuration verified");
    Ok(())
}

/// The LDAP server is configured for `domain` and the admin bind finds `user`.
pub async fn check_ldap_server<E: CommandExecutor>(
    session: &E,
    admin_password: &str,
    domain: &str,
    user: &str,
) -> Result<()> {
    let base = ldap_base_dn(domain)?;
    let conf = run(session, Node::Session, cmd::LDAP_CONF).await?;
    ensure_contains("LDAP server base", &conf, &format!("BASE   {base}"))?;

    let output = run(session, Node::Session, &admin_search(&base, admin_password)).await?;
    ensure_contains("LDAP admin search base", &output, &base)?;
    ensure_contains(
        format!("LDAP admin search for {user}"),
        &output,
        &format!("uid: {user}"),
    )?;
    tracing::info!(domain, user, "LDAP server configuration verified");
    Ok(())
}

/// Adds `new_user` on the LDAP server by cloning the entry of `user`.
pub async fn add_ldap_user<E: CommandExecutor>(
    session: &E,
    admin_password: &str,
    domain: &str,
    user: &str,
    new_user: &str,
) -> Result<()> {
    if new_user.is_empty() {
        return Err(Error::EmptyInput { what: "new LDAP user" });
    }
    let base = ldap_base_dn(domain)?;

    let template = run(session, Node::Session, cmd::LDAP_USERS_LDIF).await?;
    if !template.contains(user) {
        return Err(Error::not_found(format!("LDAP user {user} in users.ldif"), template));
    }
    let ldif = template.trim().replace(user, new_user);
    let file = markers::LDAP_NEW_USER_FILE;
    run(
        session,
        Node::Session,
        &format!("cat > {file} <<'EOF'\n{ldif}\nEOF"),
    )
    .await?;

    let added = run(
        session,
        Node::Session,
        &format!("ldapadd -x -D cn=admin,{base} -w {admin_password} -f {file}"),
    )
    .await?;
    ensure_contains(format!("ldapadd of {new_user}"), &added, &format!("uid={new_user}"))?;

    let search = run(session, Node::Session, &admin_search(&base, admin_password)).await?;
    ensure_contains(
        format!("LDAP admin search for {new_user}"),
        &search,
        &format!("uid: {new_user}"),
    )?;
    tracing::info!(new_user, "LDAP user added");
    Ok(())
}
