pub(crate) mod table;

use crate::ListingFormat;
use table::IntoTable;

use crate::die;

pub(crate) fn format_output<O: IntoTable + serde::Serialize>(object: O, format: ListingFormat) {
    match format {
        ListingFormat::Json => {
            let output = match serde_json::to_string_pretty(&object) {
                Ok(output) => output,
                Err(err) => die!("failed to serialize output: {}", err),
            };

            println!("{}", output);
        }
        ListingFormat::Table => {
            let tab = object.into_table();

            print!("{}", tab);
        }
        ListingFormat::HeaderlessTable => {
            let mut tab = object.into_table();

            tab.print_header(false);

            print!("{}", tab);
        }
    }
}
