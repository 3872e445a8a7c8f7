/*
 * Copyright © 2024, United States Government, as represented by the Administrator of
 * the National Aeronautics and Space Administration. All rights reserved.
 *
 * The “ODIN” software is licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License. You may obtain a copy
 * of the License at http://www.apache.org/licenses/LICENSE-2.0.
 *
 * Unless required by applicable law or agreed to in writing, software distributed under
 * the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
 * either express or implied. See the License for the specific language governing permissions
 * and limitations under the License.
 */
#![allow(unused)]

use cci_odp::metadata::{extract_metadata_from_descxml, extract_metadata_from_odd, harmonize_pair};

// run with "cargo test test_odd -- --nocapture"

const ODD_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<os:OpenSearchDescription xmlns:os="http://a9.com/-/spec/opensearch/1.1/"
                          xmlns:param="http://a9.com/-/spec/opensearch/extensions/parameters/1.0/">
  <os:ShortName>CCI Open Data Portal</os:ShortName>
  <os:Url type="application/geo+json" template="https://archive.opensearch.ceda.ac.uk/opensearch/request?q={searchTerms}">
    <param:Parameter name="ecv" value="{ecv}">
      <param:Option value="OC" label="OC (217859)"/>
    </param:Parameter>
    <param:Parameter name="frequency" value="{frequency}">
      <param:Option value="day" label="day (190218)"/>
      <param:Option value="5 days" label="5 days (13346)"/>
      <param:Option value="month" label="month (2230)"/>
    </param:Parameter>
    <param:Parameter name="processingLevel" value="{processingLevel}">
      <param:Option value="L3S" label="L3S (217859)"/>
    </param:Parameter>
    <param:Parameter name="fileFormat" value="{fileFormat}">
      <param:Option value=".nc" label=".nc (217859)"/>
    </param:Parameter>
    <param:Parameter name="drsId" value="{drsId}">
      <param:Option value="esacci.OC.day.L3S.CHLOR_A.multi-sensor.multi-platform.MERGED.3-1.geographic" label="esacci.OC.day... (190218)"/>
      <param:Option value="esacci.OC.5-days.L3S.CHLOR_A.multi-sensor.multi-platform.MERGED.3-1.geographic" label="esacci.OC.5-days... (13346)"/>
    </param:Parameter>
  </os:Url>
</os:OpenSearchDescription>"#;

#[test]
fn test_odd () {
    let odd = extract_metadata_from_odd(ODD_XML).unwrap();

    // single options land in the singular field, many in the list field
    assert_eq!(odd.ecv.as_deref(), Some("OC"));
    assert!(odd.ecvs.is_empty());
    assert_eq!(odd.time_frequencies, vec!["day", "5 days", "month"]);
    assert!(odd.time_frequency.is_none());
    assert_eq!(odd.processing_level.as_deref(), Some("L3S"));
    assert_eq!(odd.file_format.as_deref(), Some(".nc"));

    assert_eq!(odd.drs_ids.len(), 2);
    assert_eq!(odd.drs_id_list().len(), 2);

    // per-DRS file counts come from the numeric label suffixes
    assert_eq!(odd.num_files.get("esacci.OC.day.L3S.CHLOR_A.multi-sensor.multi-platform.MERGED.3-1.geographic"),
               Some(&190218));
    assert_eq!(odd.num_files.get("esacci.OC.5-days.L3S.CHLOR_A.multi-sensor.multi-platform.MERGED.3-1.geographic"),
               Some(&13346));
}

const DESC_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gmd:MD_Metadata xmlns:gmd="http://www.isotc211.org/2005/gmd"
                 xmlns:gco="http://www.isotc211.org/2005/gco"
                 xmlns:gml="http://www.opengis.net/gml/3.2">
  <gmd:identificationInfo>
    <gmd:MD_DataIdentification>
      <gmd:citation>
        <gmd:CI_Citation>
          <gmd:title>
            <gco:CharacterString>ESA Cloud CCI: MODIS Terra monthly products</gco:CharacterString>
          </gmd:title>
          <gmd:date>
            <gmd:CI_Date>
              <gmd:date>
                <gco:DateTime>2017-05-11T12:00:00</gco:DateTime>
              </gmd:date>
              <gmd:dateType>
                <gmd:CI_DateTypeCode codeListValue="creation">creation</gmd:CI_DateTypeCode>
              </gmd:dateType>
            </gmd:CI_Date>
          </gmd:date>
          <gmd:date>
            <gmd:CI_Date>
              <gmd:date>
                <gco:DateTime>2017-06-14T00:00:00</gco:DateTime>
              </gmd:date>
              <gmd:dateType>
                <gmd:CI_DateTypeCode codeListValue="publication">publication</gmd:CI_DateTypeCode>
              </gmd:dateType>
            </gmd:CI_Date>
          </gmd:date>
        </gmd:CI_Citation>
      </gmd:citation>
      <gmd:abstract>
        <gco:CharacterString>Global cloud property products derived from MODIS Terra.</gco:CharacterString>
      </gmd:abstract>
      <gmd:resourceConstraints>
        <gmd:MD_Constraints>
          <gmd:useLimitation>
            <gco:CharacterString>CCI data policy applies.</gco:CharacterString>
          </gmd:useLimitation>
        </gmd:MD_Constraints>
      </gmd:resourceConstraints>
      <gmd:resourceFormat>
        <gmd:MD_Format>
          <gmd:name>
            <gco:CharacterString>Data are in NetCDF format</gco:CharacterString>
          </gmd:name>
        </gmd:MD_Format>
      </gmd:resourceFormat>
      <gmd:extent>
        <gmd:EX_Extent>
          <gmd:geographicElement>
            <gmd:EX_GeographicBoundingBox>
              <gmd:westBoundLongitude><gco:Decimal>-180.0</gco:Decimal></gmd:westBoundLongitude>
              <gmd:eastBoundLongitude><gco:Decimal>180.0</gco:Decimal></gmd:eastBoundLongitude>
              <gmd:southBoundLatitude><gco:Decimal>-90.0</gco:Decimal></gmd:southBoundLatitude>
              <gmd:northBoundLatitude><gco:Decimal>90.0</gco:Decimal></gmd:northBoundLatitude>
            </gmd:EX_GeographicBoundingBox>
          </gmd:geographicElement>
          <gmd:temporalElement>
            <gmd:EX_TemporalExtent>
              <gmd:extent>
                <gml:TimePeriod gml:id="tp1">
                  <gml:beginPosition>2000-02-01T00:00:00</gml:beginPosition>
                  <gml:endPosition>2014-12-31T23:59:59</gml:endPosition>
                </gml:TimePeriod>
              </gmd:extent>
            </gmd:EX_TemporalExtent>
          </gmd:temporalElement>
        </gmd:EX_Extent>
      </gmd:extent>
    </gmd:MD_DataIdentification>
  </gmd:identificationInfo>
</gmd:MD_Metadata>"#;

#[test]
fn test_descxml () {
    let iso = extract_metadata_from_descxml(DESC_XML).unwrap();

    assert_eq!(iso.title.as_deref(), Some("ESA Cloud CCI: MODIS Terra monthly products"));
    assert_eq!(iso.abstract_text.as_deref(), Some("Global cloud property products derived from MODIS Terra."));
    assert_eq!(iso.licences, vec!["CCI data policy applies."]);

    assert_eq!(iso.bbox_minx, Some(-180.0));
    assert_eq!(iso.bbox_miny, Some(-90.0));
    assert_eq!(iso.bbox_maxx, Some(180.0));
    assert_eq!(iso.bbox_maxy, Some(90.0));

    assert_eq!(iso.temporal_coverage_start.as_deref(), Some("2000-02-01T00:00:00"));
    assert_eq!(iso.temporal_coverage_end.as_deref(), Some("2014-12-31T23:59:59"));

    // the prose format declaration is canonicalized
    assert_eq!(iso.file_formats, vec![".nc"]);

    // dates are linked through the CI_DateTypeCode text
    assert_eq!(iso.publication_date.as_deref(), Some("2017-06-14T00:00:00"));
    assert_eq!(iso.creation_date.as_deref(), Some("2017-05-11T12:00:00"));
}

#[test]
fn test_descxml_without_identification () {
    let iso = extract_metadata_from_descxml(r#"<root><other/></root>"#).unwrap();
    assert!(iso.title.is_none());
    assert!(iso.bbox_minx.is_none());
}

#[test]
fn test_harmonize_pair () {
    // single value merges into a non-trivial list
    let mut single = Some("AATSR".to_string());
    let mut list = vec!["ATSR2".to_string(), "MERIS".to_string()];
    harmonize_pair(&mut single, &mut list);
    assert!(single.is_none());
    assert_eq!(list, vec!["ATSR2", "MERIS", "AATSR"]);

    // a list that only repeats the single collapses to the single
    let mut single = Some(".nc".to_string());
    let mut list = vec![".nc".to_string()];
    harmonize_pair(&mut single, &mut list);
    assert_eq!(single.as_deref(), Some(".nc"));
    assert!(list.is_empty());

    // nothing to do without a single value
    let mut single: Option<String> = None;
    let mut list = vec!["day".to_string()];
    harmonize_pair(&mut single, &mut list);
    assert_eq!(list, vec!["day"]);

    // already contained singles just clear
    let mut single = Some("MERIS".to_string());
    let mut list = vec!["MERIS".to_string(), "MODIS".to_string()];
    harmonize_pair(&mut single, &mut list);
    assert!(single.is_none());
    assert_eq!(list, vec!["MERIS", "MODIS"]);
}
