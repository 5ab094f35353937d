use tracing::info;

use super::{session::Session, AddressBookCommand};

pub fn list_chains(session: &Session) -> eyre::Result<()> {
    for chain in session.registry.iter() {
        println!(
            "{:<16} chain id {:<8} bridge code {:<6} rpc {} bundler {}",
            chain.name,
            chain.chain_id,
            chain.bridge_chain_code,
            chain.rpc_endpoint,
            chain.bundler_endpoint
        );
    }
    Ok(())
}

pub fn address_book(session: &Session, command: AddressBookCommand) -> eyre::Result<()> {
    match command {
        AddressBookCommand::Set { key, address } => {
            let chain = session.chain()?;
            let mut book = session.store.open(chain)?;
            book.addresses_mut().set(key, address);
            book.persist()?;
            info!(
                target: "versa_omni::cli",
                chain = %chain.name,
                %key,
                %address,
                path = %book.path().display(),
                "recorded address"
            );
            println!("{}", serde_json::to_string_pretty(book.addresses())?);
        }
    }
    Ok(())
}
