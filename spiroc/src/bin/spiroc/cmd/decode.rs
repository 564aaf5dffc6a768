use super::BitstreamOptions;
use spiroc::{
    decode::{
        decode,
        select,
        DecodedField,
    },
    settings::Settings,
};

#[derive(clap::Parser)]
pub struct Cmd {
    #[clap(flatten)]
    common: BitstreamOptions,
    /// Only print the field at this sub-address
    #[clap(short, long)]
    subadd: Option<usize>,
    /// Only print the fields whose name contains this word
    #[clap(short, long, default_value = "")]
    name: String,
}

pub fn format_field(field: &DecodedField) -> String {
    format!(
        ">> {:40}, Bits:{:>4} , SubAdd {:>4} , {}",
        field.name.as_str(),
        field.bits,
        field.subadd,
        field.value
    )
}

impl Cmd {
    pub fn run(self, settings: &Settings) -> anyhow::Result<()> {
        let (bitstream, layout) = self.common.load(settings)?;
        let decoded = decode(&bitstream, &layout)?;
        for field in select(&decoded, self.subadd, &self.name)? {
            println!("{}", format_field(field));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use spiroc::decode::FieldValue;

    #[test]
    fn test_format_field() {
        let field = DecodedField {
            name: "trigger_threshold_dac".into(),
            bits: 10,
            subadd: 931,
            value: FieldValue::Whole("0011111010".to_owned()),
        };
        assert_eq!(
            format_field(&field),
            format!(
                ">> {:40}, Bits:  10 , SubAdd  931 , [0011111010]",
                "trigger_threshold_dac"
            )
        );
    }

    #[test]
    fn test_parse() {
        let cmd =
            Cmd::try_parse_from(["decode", "-c", "spiroc2b", "-f", "a.txt", "-s", "12"]).unwrap();
        assert_eq!(cmd.subadd, Some(12));
        assert_eq!(cmd.name, "");
        assert!(Cmd::try_parse_from(["decode", "-c", "spiroc3", "-f", "a.txt"]).is_err());
        assert!(Cmd::try_parse_from(["decode", "-f", "a.txt"]).is_err());
    }
}
