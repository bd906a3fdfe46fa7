use sectoken_apdu_transport_pcsc::{PcscDeviceManager, PcscReader, ReaderInterface};

/// Find a reader with a specific name
pub fn find_reader_by_name(
    manager: &PcscDeviceManager,
    reader_name: &str,
) -> Result<PcscReader, Box<dyn std::error::Error>> {
    let readers = manager.list_readers()?;

    readers
        .into_iter()
        .find(|r| r.name() == reader_name)
        .ok_or_else(|| format!("Reader '{reader_name}' not found").into())
}

/// List all available readers
pub fn list_readers(manager: &PcscDeviceManager) -> Result<(), Box<dyn std::error::Error>> {
    let readers = manager.list_readers()?;

    if readers.is_empty() {
        println!("No readers found!");
        return Ok(());
    }

    println!("Available readers:");
    for (i, reader) in readers.iter().enumerate() {
        let interface = match reader.interface() {
            ReaderInterface::Contact => "contact",
            ReaderInterface::Contactless => "contactless",
        };
        match reader.atr() {
            Some(atr) => println!(
                "{}. {} ({interface}, ATR {})",
                i + 1,
                reader.name(),
                hex::encode_upper(atr)
            ),
            None => println!("{}. {} ({interface}, no card)", i + 1, reader.name()),
        }
    }

    Ok(())
}

/// Find a reader with a card inserted
pub fn find_reader_with_card(
    manager: &PcscDeviceManager,
) -> Result<PcscReader, Box<dyn std::error::Error>> {
    let readers = manager.list_readers()?;

    if readers.is_empty() {
        return Err("No readers found!".into());
    }

    readers
        .into_iter()
        .find(|r| r.has_card())
        .ok_or_else(|| "No card found in any reader!".into())
}
