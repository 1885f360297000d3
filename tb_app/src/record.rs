use serde::Deserialize;
use serde::Serialize;

/// Column names of the generated dataset, in file order
pub const HEADERS: [&str; 7] = ["ID", "Name", "Country", "Address", "PhoneNumber", "CurrentCompany", "Salary"];

/// One row of the synthetic people dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "ID")]
    pub id: u64,

    #[serde(rename = "Name")]
    pub name: String,

    #[serde(rename = "Country")]
    pub country: String,

    #[serde(rename = "Address")]
    pub address: String,

    #[serde(rename = "PhoneNumber")]
    pub phone_number: String,

    #[serde(rename = "CurrentCompany")]
    pub current_company: String,

    /// Two-decimal string on disk
    #[serde(rename = "Salary", serialize_with = "two_decimals")]
    pub salary: f64,
}

impl Record {
    /// Fields as written to CSV
    pub fn to_row(&self) -> [String; 7] {
        [
            self.id.to_string(),
            self.name.clone(),
            self.country.clone(),
            self.address.clone(),
            self.phone_number.clone(),
            self.current_company.clone(),
            format!("{:.2}", self.salary),
        ]
    }
}

fn two_decimals<S: serde::Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&format_args!("{value:.2}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Record {
        Record {
            id: 7,
            name: "Niki".to_string(),
            country: "Japan".to_string(),
            address: "JL. Bagus Wakanda".to_string(),
            phone_number: "+62812345".to_string(),
            current_company: "Company C".to_string(),
            salary: 1234.5,
        }
    }

    #[test]
    fn test_csv_layout() {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.serialize(sample()).unwrap();
        let text = String::from_utf8(writer.into_inner().unwrap()).unwrap();

        assert_eq!(text, "ID,Name,Country,Address,PhoneNumber,CurrentCompany,Salary\n7,Niki,Japan,JL. Bagus Wakanda,+62812345,Company C,1234.50\n");
    }

    #[test]
    fn test_to_row_matches_headers() {
        let row = sample().to_row();
        assert_eq!(row.len(), HEADERS.len());
        assert_eq!(row[6], "1234.50");
    }
}
